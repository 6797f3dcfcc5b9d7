// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Typed "ask peer" operations.
//!
//! One async method per peer operation. Each builds its protobuf body,
//! frames it with the transaction identity, parks on a oneshot completion
//! handle while the queue serializes the transaction's requests, and decodes
//! the answer against its statically-known expectations. Requests within a
//! transaction complete in issue order; requests across transactions
//! interleave freely.

use std::collections::HashMap;
use std::sync::Arc;

use prost::Message;
use tokio::sync::oneshot;

use crate::error::Error;
use crate::iterators::{HistoryQueryIterator, StateQueryIterator};
use crate::protos::chaincode_message::Type;
use crate::protos::{
    self, ChaincodeId, ChaincodeInput, ChaincodeMessage, ChaincodeSpec, QueryResponse,
    QueryResponseMetadata, Response, StateMetadata,
};
use crate::queue::TransactionQueues;

/// Handle through which one transaction talks to the peer.
///
/// Cheap to clone; clones share the connection's queues and carry the same
/// transaction identity.
#[derive(Clone, Debug)]
pub struct PeerRequester {
    queues: Arc<TransactionQueues>,
    channel_id: String,
    txid: String,
}

impl PeerRequester {
    pub fn new(queues: Arc<TransactionQueues>, channel_id: String, txid: String) -> Self {
        Self {
            queues,
            channel_id,
            txid,
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn txid(&self) -> &str {
        &self.txid
    }

    /// Enqueues one request frame and suspends until the matching
    /// RESPONSE/ERROR arrives or the stream dies.
    async fn ask(&self, ty: Type, payload: Vec<u8>) -> Result<ChaincodeMessage, Error> {
        let (tx, rx) = oneshot::channel();
        let message = ChaincodeMessage {
            r#type: ty as i32,
            payload,
            txid: self.txid.clone(),
            channel_id: self.channel_id.clone(),
            ..Default::default()
        };
        self.queues.enqueue(message, tx);
        rx.await.map_err(|_| Error::StreamTerminated)?
    }

    /// Unwraps a RESPONSE payload; maps an ERROR frame to [`Error::Peer`]
    /// and anything else to the incorrect-type diagnostic for `method`.
    fn expect_response(
        &self,
        frame: ChaincodeMessage,
        method: &'static str,
    ) -> Result<Vec<u8>, Error> {
        match frame.r#type() {
            Type::Response => Ok(frame.payload),
            Type::Error => Err(Error::Peer(
                String::from_utf8_lossy(&frame.payload).into_owned(),
            )),
            other => Err(Error::UnexpectedResponseType {
                channel_id: self.channel_id.clone(),
                txid: self.txid.clone(),
                method,
                type_name: other.as_str_name().to_string(),
            }),
        }
    }

    pub async fn get_state(&self, collection: &str, key: &str) -> Result<Vec<u8>, Error> {
        let body = protos::GetState {
            key: key.to_owned(),
            collection: collection.to_owned(),
        };
        let frame = self.ask(Type::GetState, body.encode_to_vec()).await?;
        self.expect_response(frame, "GetState")
    }

    pub async fn put_state(
        &self,
        collection: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<Vec<u8>, Error> {
        let body = protos::PutState {
            key: key.to_owned(),
            value,
            collection: collection.to_owned(),
        };
        let frame = self.ask(Type::PutState, body.encode_to_vec()).await?;
        self.expect_response(frame, "PutState")
    }

    pub async fn delete_state(&self, collection: &str, key: &str) -> Result<Vec<u8>, Error> {
        let body = protos::DelState {
            key: key.to_owned(),
            collection: collection.to_owned(),
        };
        let frame = self.ask(Type::DelState, body.encode_to_vec()).await?;
        self.expect_response(frame, "DeleteState")
    }

    /// Returns the key's endorsement metadata as a `metakey → value` map.
    pub async fn get_state_metadata(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<HashMap<String, Vec<u8>>, Error> {
        let body = protos::GetStateMetadata {
            key: key.to_owned(),
            collection: collection.to_owned(),
        };
        let frame = self.ask(Type::GetStateMetadata, body.encode_to_vec()).await?;
        let payload = self.expect_response(frame, "GetStateMetadata")?;
        decode_metadata_map(&payload)
    }

    pub async fn put_state_metadata(
        &self,
        collection: &str,
        key: &str,
        metakey: &str,
        value: Vec<u8>,
    ) -> Result<Vec<u8>, Error> {
        let body = protos::PutStateMetadata {
            key: key.to_owned(),
            collection: collection.to_owned(),
            metadata: Some(StateMetadata {
                metakey: metakey.to_owned(),
                value,
            }),
        };
        let frame = self.ask(Type::PutStateMetadata, body.encode_to_vec()).await?;
        self.expect_response(frame, "PutStateMetadata")
    }

    pub async fn get_private_data_hash(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Vec<u8>, Error> {
        let body = protos::GetState {
            key: key.to_owned(),
            collection: collection.to_owned(),
        };
        let frame = self
            .ask(Type::GetPrivateDataHash, body.encode_to_vec())
            .await?;
        self.expect_response(frame, "GetPrivateDataHash")
    }

    /// Opens a range scan cursor. `metadata` carries encoded pagination
    /// hints when present.
    pub async fn get_state_by_range(
        &self,
        collection: &str,
        start_key: &str,
        end_key: &str,
        metadata: Option<Vec<u8>>,
    ) -> Result<(StateQueryIterator, QueryResponseMetadata), Error> {
        let body = protos::GetStateByRange {
            start_key: start_key.to_owned(),
            end_key: end_key.to_owned(),
            collection: collection.to_owned(),
            metadata: metadata.unwrap_or_default(),
        };
        let frame = self.ask(Type::GetStateByRange, body.encode_to_vec()).await?;
        let payload = self.expect_response(frame, "GetStateByRange")?;
        self.open_cursor(&payload)
    }

    /// Runs a rich query against the peer's state database.
    pub async fn get_query_result(
        &self,
        collection: &str,
        query: &str,
        metadata: Option<Vec<u8>>,
    ) -> Result<(StateQueryIterator, QueryResponseMetadata), Error> {
        let body = protos::GetQueryResult {
            query: query.to_owned(),
            collection: collection.to_owned(),
            metadata: metadata.unwrap_or_default(),
        };
        let frame = self.ask(Type::GetQueryResult, body.encode_to_vec()).await?;
        let payload = self.expect_response(frame, "GetQueryResult")?;
        self.open_cursor(&payload)
    }

    pub async fn get_history_for_key(
        &self,
        key: &str,
    ) -> Result<(HistoryQueryIterator, QueryResponseMetadata), Error> {
        let body = protos::GetHistoryForKey { key: key.to_owned() };
        let frame = self
            .ask(Type::GetHistoryForKey, body.encode_to_vec())
            .await?;
        let payload = self.expect_response(frame, "GetHistoryForKey")?;
        self.open_cursor(&payload)
    }

    /// Fetches the next page of an open cursor.
    pub async fn query_state_next(&self, id: &str) -> Result<QueryResponse, Error> {
        let body = protos::QueryStateNext { id: id.to_owned() };
        let frame = self.ask(Type::QueryStateNext, body.encode_to_vec()).await?;
        let payload = self.expect_response(frame, "QueryStateNext")?;
        Ok(QueryResponse::decode(payload.as_slice())?)
    }

    /// Releases a peer-side cursor.
    pub async fn query_state_close(&self, id: &str) -> Result<QueryResponse, Error> {
        let body = protos::QueryStateClose { id: id.to_owned() };
        let frame = self.ask(Type::QueryStateClose, body.encode_to_vec()).await?;
        let payload = self.expect_response(frame, "QueryStateClose")?;
        Ok(QueryResponse::decode(payload.as_slice())?)
    }

    /// Invokes another chaincode on this or another channel. The answer is
    /// the callee's own chaincode message: COMPLETED carries its `Response`,
    /// ERROR fails the call with the callee's message, anything else is
    /// passed through as raw payload bytes.
    pub async fn invoke_chaincode(
        &self,
        chaincode_name: &str,
        args: Vec<Vec<u8>>,
    ) -> Result<Response, Error> {
        let body = ChaincodeSpec {
            chaincode_id: Some(ChaincodeId {
                name: chaincode_name.to_owned(),
                ..Default::default()
            }),
            input: Some(ChaincodeInput {
                args,
                ..Default::default()
            }),
            ..Default::default()
        };
        let frame = self.ask(Type::InvokeChaincode, body.encode_to_vec()).await?;
        let payload = self.expect_response(frame, "InvokeChaincode")?;
        decode_invoke_response(&payload)
    }

    fn open_cursor<T: prost::Message + Default>(
        &self,
        payload: &[u8],
    ) -> Result<(crate::iterators::QueryIterator<T>, QueryResponseMetadata), Error> {
        let response = QueryResponse::decode(payload)?;
        let metadata = QueryResponseMetadata::decode(response.metadata.as_slice())?;
        Ok((
            crate::iterators::QueryIterator::new(self.clone(), response),
            metadata,
        ))
    }
}

fn decode_metadata_map(payload: &[u8]) -> Result<HashMap<String, Vec<u8>>, Error> {
    let result = protos::StateMetadataResult::decode(payload)?;
    Ok(result
        .entries
        .into_iter()
        .map(|entry| (entry.metakey, entry.value))
        .collect())
}

/// Unwraps the inner chaincode message of an INVOKE_CHAINCODE answer.
fn decode_invoke_response(payload: &[u8]) -> Result<Response, Error> {
    let inner = ChaincodeMessage::decode(payload)?;
    match inner.r#type() {
        Type::Completed => Ok(Response::decode(inner.payload.as_slice())?),
        Type::Error => {
            let response = Response::decode(inner.payload.as_slice())?;
            Err(Error::Peer(response.message))
        }
        _ => Ok(Response {
            status: crate::chaincode::OK,
            message: String::new(),
            payload: inner.payload,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FrameSink;

    struct NullSink;

    impl FrameSink for NullSink {
        fn send(&self, _frame: ChaincodeMessage) -> Result<(), Error> {
            Ok(())
        }
    }

    fn requester() -> PeerRequester {
        PeerRequester::new(
            Arc::new(TransactionQueues::new(Arc::new(NullSink))),
            "theChannelID".into(),
            "theTxID".into(),
        )
    }

    fn frame(ty: Type, payload: Vec<u8>) -> ChaincodeMessage {
        ChaincodeMessage {
            r#type: ty as i32,
            payload,
            txid: "theTxID".into(),
            channel_id: "theChannelID".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_expect_response_passes_payload_through() {
        let payload = requester()
            .expect_response(frame(Type::Response, b"hi".to_vec()), "GetState")
            .unwrap();
        assert_eq!(payload, b"hi");
    }

    #[test]
    fn test_expect_response_maps_error_frame_to_utf8_message() {
        let err = requester()
            .expect_response(frame(Type::Error, b"no such key".to_vec()), "GetState")
            .unwrap_err();
        assert_eq!(err.to_string(), "no such key");
    }

    #[test]
    fn test_expect_response_rejects_wrong_type() {
        let err = requester()
            .expect_response(frame(Type::Init, Vec::new()), "PutState")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "[theChannelID-theTxID] Received incorrect chaincode in response to the PutState() call: type=\"INIT\", expecting \"RESPONSE\""
        );
    }

    #[test]
    fn test_metadata_map_roundtrip() {
        let result = protos::StateMetadataResult {
            entries: vec![
                StateMetadata {
                    metakey: "k1".into(),
                    value: b"v1".to_vec(),
                },
                StateMetadata {
                    metakey: "k2".into(),
                    value: b"v2".to_vec(),
                },
            ],
        };
        let map = decode_metadata_map(&result.encode_to_vec()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["k1"], b"v1");
        assert_eq!(map["k2"], b"v2");
    }

    #[test]
    fn test_invoke_response_completed_unwraps_response() {
        let response = Response {
            status: 200,
            message: String::new(),
            payload: b"result".to_vec(),
        };
        let inner = frame(Type::Completed, response.encode_to_vec());
        let decoded = decode_invoke_response(&inner.encode_to_vec()).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_invoke_response_error_fails_with_callee_message() {
        let response = Response {
            status: 500,
            message: "wibble".into(),
            payload: Vec::new(),
        };
        let inner = frame(Type::Error, response.encode_to_vec());
        let err = decode_invoke_response(&inner.encode_to_vec()).unwrap_err();
        assert!(err.to_string().contains("wibble"));
    }

    #[test]
    fn test_invoke_response_other_type_passes_raw_payload() {
        let inner = frame(Type::Response, b"raw".to_vec());
        let decoded = decode_invoke_response(&inner.encode_to_vec()).unwrap();
        assert_eq!(decoded.payload, b"raw");
        assert_eq!(decoded.status, crate::chaincode::OK);
    }
}
