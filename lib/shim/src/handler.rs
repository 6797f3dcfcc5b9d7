// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Connection state machine and transaction dispatch.
//!
//! The handler classifies every inbound frame against the connection state.
//! Until the handshake completes, only REGISTERED then READY advance the
//! state; anything else is answered with a diagnostic ERROR frame and the
//! state stays put. Once ready, correlated RESPONSE/ERROR frames feed the
//! per-transaction queues, INIT/TRANSACTION frames each spawn a task that
//! runs user code and reports COMPLETED/ERROR back, and a frame type this
//! shim does not speak terminates the process: the peer is running a
//! protocol we do not know, and failing fast beats silent corruption.
//!
//! The inbound path never suspends. It enqueues, spawns, and returns.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use prost::Message;

use crate::chaincode::{Chaincode, ERROR};
use crate::peer::PeerRequester;
use crate::protos::chaincode_message::Type;
use crate::protos::{ChaincodeEvent, ChaincodeInput, ChaincodeMessage, Response};
use crate::queue::TransactionQueues;
use crate::stub::ChaincodeStub;
use crate::transport::FrameSink;

/// Connection lifecycle. Only ever advances; see [`ChaincodeMessageHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Created,
    Established,
    Ready,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamState::Created => write!(f, "created"),
            StreamState::Established => write!(f, "established"),
            StreamState::Ready => write!(f, "ready"),
        }
    }
}

/// Routes one connection's inbound frames and dispatches transactions.
pub struct ChaincodeMessageHandler<C: Chaincode> {
    chaincode: Arc<C>,
    queues: Arc<TransactionQueues>,
    sink: Arc<dyn FrameSink>,
    state: Arc<Mutex<StreamState>>,
}

impl<C: Chaincode> Clone for ChaincodeMessageHandler<C> {
    fn clone(&self) -> Self {
        Self {
            chaincode: self.chaincode.clone(),
            queues: self.queues.clone(),
            sink: self.sink.clone(),
            state: self.state.clone(),
        }
    }
}

impl<C: Chaincode> fmt::Display for ChaincodeMessageHandler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChaincodeMessageHandler : {{}}")
    }
}

impl<C: Chaincode> ChaincodeMessageHandler<C> {
    pub fn new(
        chaincode: Arc<C>,
        queues: Arc<TransactionQueues>,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        Self {
            chaincode,
            queues,
            sink,
            state: Arc::new(Mutex::new(StreamState::Created)),
        }
    }

    /// Classifies and routes one inbound frame. Never suspends.
    pub fn handle_message(&self, message: ChaincodeMessage) {
        let current = *self.state.lock();
        let msg_type = message.r#type();
        tracing::trace!(state = %current, frame_type = msg_type.as_str_name(), txid = %message.txid, "inbound frame");

        match current {
            StreamState::Created => {
                if msg_type == Type::Registered {
                    *self.state.lock() = StreamState::Established;
                    tracing::debug!("registered with peer");
                } else {
                    self.reject(&message, current);
                }
            }
            StreamState::Established => {
                if msg_type == Type::Ready {
                    *self.state.lock() = StreamState::Ready;
                    tracing::debug!("peer signalled ready");
                } else {
                    self.reject(&message, current);
                }
            }
            StreamState::Ready => match msg_type {
                Type::Init => self.dispatch(message, true),
                Type::Transaction => self.dispatch(message, false),
                Type::Response | Type::Error => self.queues.on_response(message),
                Type::Registered | Type::Ready => {
                    tracing::trace!(frame_type = msg_type.as_str_name(), "ignoring redundant handshake frame");
                }
                other => {
                    tracing::error!(
                        frame_type = other.as_str_name(),
                        txid = %message.txid,
                        "unrecognized frame in ready state; protocol is desynchronized"
                    );
                    std::process::exit(1);
                }
            },
        }
    }

    /// Answers a pre-ready protocol violation with a diagnostic ERROR frame.
    /// The state does not change.
    fn reject(&self, message: &ChaincodeMessage, state: StreamState) {
        let text = format!(
            "[{}-{}] Chaincode handler FSM cannot handle message ({}) with payload size ({}) while in state: {}",
            message.channel_id,
            message.txid,
            message.r#type().as_str_name(),
            message.payload.len(),
            state
        );
        tracing::error!("{text}");
        self.write_frame(error_frame(
            &message.channel_id,
            &message.txid,
            text.into_bytes(),
        ));
    }

    /// Spawns one task per invocation; transactions run concurrently.
    fn dispatch(&self, message: ChaincodeMessage, is_init: bool) {
        let handler = self.clone();
        tokio::spawn(async move {
            handler.run_transaction(message, is_init).await;
        });
    }

    async fn run_transaction(&self, message: ChaincodeMessage, is_init: bool) {
        let channel_id = message.channel_id;
        let txid = message.txid;

        let input = match ChaincodeInput::decode(message.payload.as_slice()) {
            Ok(input) => input,
            Err(err) => {
                tracing::warn!(%err, txid = %txid, "invocation payload did not decode");
                // The peer diagnoses from the original bytes.
                self.write_frame(error_frame(&channel_id, &txid, message.payload));
                return;
            }
        };

        let requester =
            PeerRequester::new(self.queues.clone(), channel_id.clone(), txid.clone());
        let mut stub = match ChaincodeStub::new(
            requester,
            channel_id.clone(),
            txid.clone(),
            input,
            message.proposal,
        ) {
            Ok(stub) => stub,
            Err(err) => {
                tracing::warn!(%err, txid = %txid, "failed to construct transaction context");
                self.write_frame(error_frame(
                    &channel_id,
                    &txid,
                    err.to_string().into_bytes(),
                ));
                return;
            }
        };

        let outcome = if is_init {
            self.chaincode.init(&mut stub).await
        } else {
            self.chaincode.invoke(&mut stub).await
        };

        match outcome {
            Ok(response) if response.status == 0 => {
                // The peer requires an explicit status; a handler that
                // resolved without one is reported as a failed transaction.
                let operation = if is_init { "Init" } else { "Invoke" };
                let short_txid: String = txid.chars().take(8).collect();
                let response = Response {
                    status: ERROR,
                    message: format!(
                        "[{channel_id}-{short_txid}] Calling chaincode {operation}() has not called success or error."
                    ),
                    payload: Vec::new(),
                };
                self.write_frame(completed_frame(&channel_id, &txid, &response, None));
            }
            Ok(response) => {
                self.write_frame(completed_frame(
                    &channel_id,
                    &txid,
                    &response,
                    stub.take_event(),
                ));
            }
            Err(err) => {
                tracing::debug!(txid = %txid, %err, "chaincode invocation failed");
                self.write_frame(error_frame(
                    &channel_id,
                    &txid,
                    err.to_string().into_bytes(),
                ));
            }
        }
    }

    fn write_frame(&self, frame: ChaincodeMessage) {
        if let Err(err) = self.sink.send(frame) {
            tracing::error!(%err, "failed to write frame to peer");
        }
    }
}

fn error_frame(channel_id: &str, txid: &str, payload: Vec<u8>) -> ChaincodeMessage {
    ChaincodeMessage {
        r#type: Type::Error as i32,
        payload,
        txid: txid.to_owned(),
        channel_id: channel_id.to_owned(),
        ..Default::default()
    }
}

fn completed_frame(
    channel_id: &str,
    txid: &str,
    response: &Response,
    event: Option<ChaincodeEvent>,
) -> ChaincodeMessage {
    ChaincodeMessage {
        r#type: Type::Completed as i32,
        payload: response.encode_to_vec(),
        txid: txid.to_owned(),
        channel_id: channel_id.to_owned(),
        chaincode_event: event,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(StreamState::Created.to_string(), "created");
        assert_eq!(StreamState::Established.to_string(), "established");
        assert_eq!(StreamState::Ready.to_string(), "ready");
    }

    #[test]
    fn test_error_frame_shape() {
        let frame = error_frame("mychannel", "tx-1", b"boom".to_vec());
        assert_eq!(frame.r#type(), Type::Error);
        assert_eq!(frame.channel_id, "mychannel");
        assert_eq!(frame.txid, "tx-1");
        assert_eq!(frame.payload, b"boom");
    }

    #[test]
    fn test_completed_frame_carries_event() {
        let response = Response::success(Vec::new());
        let event = ChaincodeEvent {
            event_name: "transfer".into(),
            ..Default::default()
        };
        let frame = completed_frame("mychannel", "tx-1", &response, Some(event));
        assert_eq!(frame.r#type(), Type::Completed);
        assert_eq!(
            frame.chaincode_event.as_ref().unwrap().event_name,
            "transfer"
        );
        let decoded = Response::decode(frame.payload.as_slice()).unwrap();
        assert_eq!(decoded, response);
    }
}
