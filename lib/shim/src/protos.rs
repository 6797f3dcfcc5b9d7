// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Wire types for the peer's chaincode-support protocol.
//!
//! These message definitions are vendored from the peer's protobuf schema so
//! the crate builds without a protoc toolchain. Field numbers are normative:
//! the peer decodes these frames byte-for-byte, so tags must never be
//! renumbered. Only the subset of the schema this shim speaks is carried.

use std::collections::HashMap;

/// One frame on the bidirectional chaincode-support stream.
///
/// The concatenation of `channel_id` and `txid` is the correlation key for
/// every routed frame; the shim makes no other uniqueness assumption.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChaincodeMessage {
    #[prost(enumeration = "chaincode_message::Type", tag = "1")]
    pub r#type: i32,
    #[prost(bytes = "vec", tag = "3")]
    pub payload: Vec<u8>,
    #[prost(string, tag = "4")]
    pub txid: String,
    #[prost(message, optional, tag = "5")]
    pub proposal: Option<SignedProposal>,
    /// Carried on outbound COMPLETED frames when the transaction emitted an event.
    #[prost(message, optional, tag = "6")]
    pub chaincode_event: Option<ChaincodeEvent>,
    #[prost(string, tag = "7")]
    pub channel_id: String,
}

pub mod chaincode_message {
    /// Frame type discriminant. Tag 12 is retired in the peer's schema and
    /// must stay unassigned.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
        Undefined = 0,
        Register = 1,
        Registered = 2,
        Init = 3,
        Ready = 4,
        Transaction = 5,
        Completed = 6,
        Error = 7,
        GetState = 8,
        PutState = 9,
        DelState = 10,
        InvokeChaincode = 11,
        Response = 13,
        GetStateByRange = 14,
        GetQueryResult = 15,
        QueryStateNext = 16,
        QueryStateClose = 17,
        Keepalive = 18,
        GetHistoryForKey = 19,
        GetStateMetadata = 20,
        PutStateMetadata = 21,
        GetPrivateDataHash = 22,
    }

    impl Type {
        /// The schema name of the variant, as the peer spells it in diagnostics.
        pub fn as_str_name(&self) -> &'static str {
            match self {
                Type::Undefined => "UNDEFINED",
                Type::Register => "REGISTER",
                Type::Registered => "REGISTERED",
                Type::Init => "INIT",
                Type::Ready => "READY",
                Type::Transaction => "TRANSACTION",
                Type::Completed => "COMPLETED",
                Type::Error => "ERROR",
                Type::GetState => "GET_STATE",
                Type::PutState => "PUT_STATE",
                Type::DelState => "DEL_STATE",
                Type::InvokeChaincode => "INVOKE_CHAINCODE",
                Type::Response => "RESPONSE",
                Type::GetStateByRange => "GET_STATE_BY_RANGE",
                Type::GetQueryResult => "GET_QUERY_RESULT",
                Type::QueryStateNext => "QUERY_STATE_NEXT",
                Type::QueryStateClose => "QUERY_STATE_CLOSE",
                Type::Keepalive => "KEEPALIVE",
                Type::GetHistoryForKey => "GET_HISTORY_FOR_KEY",
                Type::GetStateMetadata => "GET_STATE_METADATA",
                Type::PutStateMetadata => "PUT_STATE_METADATA",
                Type::GetPrivateDataHash => "GET_PRIVATE_DATA_HASH",
            }
        }
    }
}

/// Identity the shim registers under. Only `name` is required by the peer.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChaincodeId {
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub version: String,
}

/// Invocation arguments carried inside INIT/TRANSACTION payloads.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChaincodeInput {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub args: Vec<Vec<u8>>,
    #[prost(map = "string, bytes", tag = "2")]
    pub decorations: HashMap<String, Vec<u8>>,
    #[prost(bool, tag = "3")]
    pub is_init: bool,
}

/// Target description for a cross-chaincode call (INVOKE_CHAINCODE body).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChaincodeSpec {
    #[prost(int32, tag = "1")]
    pub r#type: i32,
    #[prost(message, optional, tag = "2")]
    pub chaincode_id: Option<ChaincodeId>,
    #[prost(message, optional, tag = "3")]
    pub input: Option<ChaincodeInput>,
    #[prost(int32, tag = "4")]
    pub timeout: i32,
}

/// Transaction outcome returned by user code and carried on COMPLETED frames.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    /// A status code following HTTP semantics; 200-class is success.
    #[prost(int32, tag = "1")]
    pub status: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(bytes = "vec", tag = "3")]
    pub payload: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChaincodeEvent {
    #[prost(string, tag = "1")]
    pub chaincode_id: String,
    #[prost(string, tag = "2")]
    pub tx_id: String,
    #[prost(string, tag = "3")]
    pub event_name: String,
    #[prost(bytes = "vec", tag = "4")]
    pub payload: Vec<u8>,
}

/// The endorsement proposal attached to an invocation, opaque to the shim
/// except for the outer framing.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignedProposal {
    #[prost(bytes = "vec", tag = "1")]
    pub proposal_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Proposal {
    #[prost(bytes = "vec", tag = "1")]
    pub header: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub extension: Vec<u8>,
}

// Ledger operation bodies. GET_STATE, DEL_STATE and GET_PRIVATE_DATA_HASH
// share the GetState shape on the wire.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetState {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub collection: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutState {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
    #[prost(string, tag = "3")]
    pub collection: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DelState {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub collection: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetStateMetadata {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub collection: String,
}

/// Tag 2 is reserved in the peer's schema.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutStateMetadata {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "3")]
    pub collection: String,
    #[prost(message, optional, tag = "4")]
    pub metadata: Option<StateMetadata>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StateMetadata {
    #[prost(string, tag = "1")]
    pub metakey: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StateMetadataResult {
    #[prost(message, repeated, tag = "1")]
    pub entries: Vec<StateMetadata>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetStateByRange {
    #[prost(string, tag = "1")]
    pub start_key: String,
    #[prost(string, tag = "2")]
    pub end_key: String,
    #[prost(string, tag = "3")]
    pub collection: String,
    /// Encoded [`QueryMetadata`] when the scan is paginated.
    #[prost(bytes = "vec", tag = "4")]
    pub metadata: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetQueryResult {
    #[prost(string, tag = "1")]
    pub query: String,
    #[prost(string, tag = "2")]
    pub collection: String,
    #[prost(bytes = "vec", tag = "3")]
    pub metadata: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetHistoryForKey {
    #[prost(string, tag = "1")]
    pub key: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryStateNext {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryStateClose {
    #[prost(string, tag = "1")]
    pub id: String,
}

/// One opaque record inside a [`QueryResponse`] page; the payload decodes as
/// [`Kv`] for state scans and [`KeyModification`] for history scans.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryResultBytes {
    #[prost(bytes = "vec", tag = "1")]
    pub result_bytes: Vec<u8>,
}

/// One page of a peer-side query cursor.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryResponse {
    #[prost(message, repeated, tag = "1")]
    pub results: Vec<QueryResultBytes>,
    #[prost(bool, tag = "2")]
    pub has_more: bool,
    #[prost(string, tag = "3")]
    pub id: String,
    /// Encoded [`QueryResponseMetadata`]; empty when the query was unpaginated.
    #[prost(bytes = "vec", tag = "4")]
    pub metadata: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryResponseMetadata {
    #[prost(int32, tag = "1")]
    pub fetched_records_count: i32,
    #[prost(string, tag = "2")]
    pub bookmark: String,
}

/// Pagination hints carried in the `metadata` field of a range/rich query.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryMetadata {
    #[prost(int32, tag = "1")]
    pub page_size: i32,
    #[prost(string, tag = "2")]
    pub bookmark: String,
}

/// One key/value record yielded by a range or rich query.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Kv {
    #[prost(string, tag = "1")]
    pub namespace: String,
    #[prost(string, tag = "2")]
    pub key: String,
    #[prost(bytes = "vec", tag = "3")]
    pub value: Vec<u8>,
}

/// One historical version of a key yielded by a history scan.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyModification {
    #[prost(string, tag = "1")]
    pub tx_id: String,
    #[prost(message, optional, tag = "2")]
    pub timestamp: Option<::prost_types::Timestamp>,
    #[prost(bytes = "vec", tag = "3")]
    pub value: Vec<u8>,
    #[prost(bool, tag = "4")]
    pub is_delete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_message_type_roundtrip() {
        let mut msg = ChaincodeMessage::default();
        msg.set_type(chaincode_message::Type::GetState);
        assert_eq!(msg.r#type(), chaincode_message::Type::GetState);
        assert_eq!(msg.r#type().as_str_name(), "GET_STATE");
    }

    #[test]
    fn test_unknown_type_decodes_as_undefined() {
        let msg = ChaincodeMessage {
            r#type: 99,
            ..Default::default()
        };
        assert_eq!(msg.r#type(), chaincode_message::Type::Undefined);
    }

    #[test]
    fn test_frame_encode_decode() {
        let frame = ChaincodeMessage {
            r#type: chaincode_message::Type::Transaction as i32,
            payload: b"body".to_vec(),
            txid: "tx-1".into(),
            channel_id: "mychannel".into(),
            proposal: None,
            chaincode_event: Some(ChaincodeEvent {
                chaincode_id: "cc".into(),
                tx_id: "tx-1".into(),
                event_name: "evt".into(),
                payload: vec![1, 2, 3],
            }),
        };
        let bytes = frame.encode_to_vec();
        let decoded = ChaincodeMessage::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_query_response_metadata_empty_bytes() {
        // Unpaginated responses carry no metadata; decoding the empty buffer
        // must yield the default record.
        let metadata = QueryResponseMetadata::decode(&[][..]).unwrap();
        assert_eq!(metadata.fetched_records_count, 0);
        assert_eq!(metadata.bookmark, "");
    }
}
