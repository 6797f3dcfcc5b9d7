// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Per-transaction context handed to user code.
//!
//! The stub carries the decoded invocation arguments and the transaction
//! identity, and delegates every ledger interaction to the transaction's
//! [`PeerRequester`]. All ledger operations suspend until the peer answers;
//! within one transaction they are serialized by the connection's queues.

use std::collections::HashMap;

use anyhow::Context as _;
use prost::Message;

use crate::iterators::{HistoryQueryIterator, StateQueryIterator};
use crate::peer::PeerRequester;
use crate::protos::{
    ChaincodeEvent, ChaincodeInput, Proposal, QueryMetadata, QueryResponseMetadata, Response,
    SignedProposal,
};

/// Endorsement-policy metadata lives under this key in a state's metadata map.
const VALIDATION_PARAMETER: &str = "VALIDATION_PARAMETER";

/// Composite keys start with this namespace separator.
const COMPOSITE_KEY_NAMESPACE: char = '\u{0}';

/// Largest unicode scalar; terminates partial-composite-key range scans and
/// is therefore forbidden inside key components.
const MAX_UNICODE_RUNE: char = '\u{10FFFF}';

#[derive(Debug)]
pub struct ChaincodeStub {
    requester: PeerRequester,
    channel_id: String,
    txid: String,
    args: Vec<Vec<u8>>,
    decorations: HashMap<String, Vec<u8>>,
    proposal: Option<SignedProposal>,
    event: Option<ChaincodeEvent>,
}

impl ChaincodeStub {
    /// Builds the context for one invocation. Fails when the attached
    /// proposal does not frame-decode; the dispatcher reports that failure
    /// to the peer as an ERROR frame.
    pub fn new(
        requester: PeerRequester,
        channel_id: String,
        txid: String,
        input: ChaincodeInput,
        proposal: Option<SignedProposal>,
    ) -> anyhow::Result<Self> {
        if let Some(signed) = &proposal {
            Proposal::decode(signed.proposal_bytes.as_slice())
                .context("failed to extract proposal from signed proposal")?;
        }
        Ok(Self {
            requester,
            channel_id,
            txid,
            args: input.args,
            decorations: input.decorations,
            proposal,
            event: None,
        })
    }

    // Invocation arguments and identity.

    pub fn get_args(&self) -> &[Vec<u8>] {
        &self.args
    }

    pub fn get_string_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| String::from_utf8_lossy(arg).into_owned())
            .collect()
    }

    /// The first argument as the function name, the rest as its parameters.
    pub fn get_function_and_parameters(&self) -> (String, Vec<String>) {
        let mut args = self.get_string_args();
        if args.is_empty() {
            return (String::new(), Vec::new());
        }
        let function = args.remove(0);
        (function, args)
    }

    pub fn get_channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn get_txid(&self) -> &str {
        &self.txid
    }

    pub fn get_decorations(&self) -> &HashMap<String, Vec<u8>> {
        &self.decorations
    }

    pub fn get_signed_proposal(&self) -> Option<&SignedProposal> {
        self.proposal.as_ref()
    }

    // World state. The empty collection name addresses public state.

    pub async fn get_state(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        Ok(self.requester.get_state("", key).await?)
    }

    pub async fn put_state(&self, key: &str, value: Vec<u8>) -> anyhow::Result<()> {
        self.requester.put_state("", key, value).await?;
        Ok(())
    }

    pub async fn delete_state(&self, key: &str) -> anyhow::Result<()> {
        self.requester.delete_state("", key).await?;
        Ok(())
    }

    pub async fn get_state_validation_parameter(
        &self,
        key: &str,
    ) -> anyhow::Result<Option<Vec<u8>>> {
        let mut metadata = self.requester.get_state_metadata("", key).await?;
        Ok(metadata.remove(VALIDATION_PARAMETER))
    }

    pub async fn set_state_validation_parameter(
        &self,
        key: &str,
        endorsement_policy: Vec<u8>,
    ) -> anyhow::Result<()> {
        self.requester
            .put_state_metadata("", key, VALIDATION_PARAMETER, endorsement_policy)
            .await?;
        Ok(())
    }

    // Private-data collections.

    pub async fn get_private_data(&self, collection: &str, key: &str) -> anyhow::Result<Vec<u8>> {
        validate_collection(collection)?;
        Ok(self.requester.get_state(collection, key).await?)
    }

    pub async fn put_private_data(
        &self,
        collection: &str,
        key: &str,
        value: Vec<u8>,
    ) -> anyhow::Result<()> {
        validate_collection(collection)?;
        self.requester.put_state(collection, key, value).await?;
        Ok(())
    }

    pub async fn delete_private_data(&self, collection: &str, key: &str) -> anyhow::Result<()> {
        validate_collection(collection)?;
        self.requester.delete_state(collection, key).await?;
        Ok(())
    }

    pub async fn get_private_data_hash(
        &self,
        collection: &str,
        key: &str,
    ) -> anyhow::Result<Vec<u8>> {
        validate_collection(collection)?;
        Ok(self.requester.get_private_data_hash(collection, key).await?)
    }

    pub async fn get_private_data_validation_parameter(
        &self,
        collection: &str,
        key: &str,
    ) -> anyhow::Result<Option<Vec<u8>>> {
        validate_collection(collection)?;
        let mut metadata = self.requester.get_state_metadata(collection, key).await?;
        Ok(metadata.remove(VALIDATION_PARAMETER))
    }

    pub async fn set_private_data_validation_parameter(
        &self,
        collection: &str,
        key: &str,
        endorsement_policy: Vec<u8>,
    ) -> anyhow::Result<()> {
        validate_collection(collection)?;
        self.requester
            .put_state_metadata(collection, key, VALIDATION_PARAMETER, endorsement_policy)
            .await?;
        Ok(())
    }

    // Queries. Unbounded range ends are the empty string.

    pub async fn get_state_by_range(
        &self,
        start_key: &str,
        end_key: &str,
    ) -> anyhow::Result<StateQueryIterator> {
        let (iterator, _) = self
            .requester
            .get_state_by_range("", start_key, end_key, None)
            .await?;
        Ok(iterator)
    }

    pub async fn get_state_by_range_with_pagination(
        &self,
        start_key: &str,
        end_key: &str,
        page_size: i32,
        bookmark: &str,
    ) -> anyhow::Result<(StateQueryIterator, QueryResponseMetadata)> {
        let metadata = pagination_metadata(page_size, bookmark);
        Ok(self
            .requester
            .get_state_by_range("", start_key, end_key, Some(metadata))
            .await?)
    }

    pub async fn get_query_result(&self, query: &str) -> anyhow::Result<StateQueryIterator> {
        let (iterator, _) = self.requester.get_query_result("", query, None).await?;
        Ok(iterator)
    }

    pub async fn get_query_result_with_pagination(
        &self,
        query: &str,
        page_size: i32,
        bookmark: &str,
    ) -> anyhow::Result<(StateQueryIterator, QueryResponseMetadata)> {
        let metadata = pagination_metadata(page_size, bookmark);
        Ok(self
            .requester
            .get_query_result("", query, Some(metadata))
            .await?)
    }

    pub async fn get_history_for_key(&self, key: &str) -> anyhow::Result<HistoryQueryIterator> {
        let (iterator, _) = self.requester.get_history_for_key(key).await?;
        Ok(iterator)
    }

    pub async fn get_private_data_by_range(
        &self,
        collection: &str,
        start_key: &str,
        end_key: &str,
    ) -> anyhow::Result<StateQueryIterator> {
        validate_collection(collection)?;
        let (iterator, _) = self
            .requester
            .get_state_by_range(collection, start_key, end_key, None)
            .await?;
        Ok(iterator)
    }

    pub async fn get_private_data_query_result(
        &self,
        collection: &str,
        query: &str,
    ) -> anyhow::Result<StateQueryIterator> {
        validate_collection(collection)?;
        let (iterator, _) = self
            .requester
            .get_query_result(collection, query, None)
            .await?;
        Ok(iterator)
    }

    // Composite keys.

    /// Builds a composite key from an object type and attribute values.
    /// Components must not contain U+0000 or U+10FFFF, which delimit the
    /// key on the ledger.
    pub fn create_composite_key(
        &self,
        object_type: &str,
        attributes: &[&str],
    ) -> anyhow::Result<String> {
        create_composite_key(object_type, attributes)
    }

    /// Splits a composite key back into its object type and attributes.
    pub fn split_composite_key(&self, composite_key: &str) -> (String, Vec<String>) {
        split_composite_key(composite_key)
    }

    /// Range-scans every key sharing the partial composite prefix.
    pub async fn get_state_by_partial_composite_key(
        &self,
        object_type: &str,
        attributes: &[&str],
    ) -> anyhow::Result<StateQueryIterator> {
        let start = create_composite_key(object_type, attributes)?;
        let end = format!("{start}{MAX_UNICODE_RUNE}");
        let (iterator, _) = self
            .requester
            .get_state_by_range("", &start, &end, None)
            .await?;
        Ok(iterator)
    }

    // Cross-chaincode calls and events.

    /// Invokes another chaincode. A non-empty `channel` addresses a
    /// chaincode on a different channel; the callee sees its own stub.
    pub async fn invoke_chaincode(
        &self,
        chaincode_name: &str,
        args: Vec<Vec<u8>>,
        channel: &str,
    ) -> anyhow::Result<Response> {
        let target = if channel.is_empty() {
            chaincode_name.to_owned()
        } else {
            format!("{chaincode_name}/{channel}")
        };
        Ok(self.requester.invoke_chaincode(&target, args).await?)
    }

    /// Registers the transaction's event. The last event set wins; it rides
    /// on the COMPLETED frame when the transaction succeeds.
    pub fn set_event(&mut self, name: &str, payload: Vec<u8>) -> anyhow::Result<()> {
        if name.is_empty() {
            anyhow::bail!("event name must not be an empty string");
        }
        self.event = Some(ChaincodeEvent {
            event_name: name.to_owned(),
            payload,
            ..Default::default()
        });
        Ok(())
    }

    pub(crate) fn take_event(&mut self) -> Option<ChaincodeEvent> {
        self.event.take()
    }
}

fn validate_collection(collection: &str) -> anyhow::Result<()> {
    if collection.is_empty() {
        anyhow::bail!("collection must not be an empty string");
    }
    Ok(())
}

fn pagination_metadata(page_size: i32, bookmark: &str) -> Vec<u8> {
    QueryMetadata {
        page_size,
        bookmark: bookmark.to_owned(),
    }
    .encode_to_vec()
}

fn create_composite_key(object_type: &str, attributes: &[&str]) -> anyhow::Result<String> {
    validate_composite_component(object_type)?;
    let mut key = format!("{COMPOSITE_KEY_NAMESPACE}{object_type}{COMPOSITE_KEY_NAMESPACE}");
    for attribute in attributes {
        validate_composite_component(attribute)?;
        key.push_str(attribute);
        key.push(COMPOSITE_KEY_NAMESPACE);
    }
    Ok(key)
}

fn split_composite_key(composite_key: &str) -> (String, Vec<String>) {
    let trimmed = composite_key
        .strip_prefix(COMPOSITE_KEY_NAMESPACE)
        .unwrap_or(composite_key);
    let mut components = trimmed
        .split(COMPOSITE_KEY_NAMESPACE)
        .map(str::to_owned)
        .collect::<Vec<_>>();
    // The key is terminated by a separator, leaving a trailing empty piece.
    if components.last().is_some_and(|component| component.is_empty()) {
        components.pop();
    }
    if components.is_empty() {
        return (String::new(), Vec::new());
    }
    let object_type = components.remove(0);
    (object_type, components)
}

fn validate_composite_component(component: &str) -> anyhow::Result<()> {
    if component.contains(COMPOSITE_KEY_NAMESPACE) || component.contains(MAX_UNICODE_RUNE) {
        anyhow::bail!("composite key component {component:?} contains a reserved character");
    }
    Ok(())
}
