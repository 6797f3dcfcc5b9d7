// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for the protocol tests: a frame-recording sink, frame
//! builders, and minimal chaincode implementations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use chaincode_shim::handler::ChaincodeMessageHandler;
use chaincode_shim::protos::chaincode_message::Type;
use chaincode_shim::protos::ChaincodeMessage;
use chaincode_shim::queue::TransactionQueues;
use chaincode_shim::{async_trait, Chaincode, ChaincodeStub, Error, FrameSink, Response};

/// Records every frame written to the peer; can be switched into a failing
/// mode to exercise synchronous send errors.
pub struct RecordingSink {
    frames: Mutex<Vec<ChaincodeMessage>>,
    broken: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            frames: Mutex::new(Vec::new()),
            broken: AtomicBool::new(false),
        })
    }

    pub fn sent(&self) -> Vec<ChaincodeMessage> {
        self.frames.lock().clone()
    }

    #[allow(dead_code)]
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }
}

impl FrameSink for RecordingSink {
    fn send(&self, frame: ChaincodeMessage) -> Result<(), Error> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(Error::Send("peer stream is closed".into()));
        }
        self.frames.lock().push(frame);
        Ok(())
    }
}

pub fn frame(ty: Type, channel_id: &str, txid: &str, payload: &[u8]) -> ChaincodeMessage {
    ChaincodeMessage {
        r#type: ty as i32,
        payload: payload.to_vec(),
        txid: txid.into(),
        channel_id: channel_id.into(),
        ..Default::default()
    }
}

/// Polls until the sink has recorded at least `count` frames.
pub async fn wait_for_frames(sink: &RecordingSink, count: usize) -> Vec<ChaincodeMessage> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let sent = sink.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("timed out waiting for outbound frames")
}

/// A handler in the `created` state wired to a recording sink.
pub fn fresh_handler<C: Chaincode>(
    chaincode: C,
) -> (
    ChaincodeMessageHandler<C>,
    Arc<TransactionQueues>,
    Arc<RecordingSink>,
) {
    let sink = RecordingSink::new();
    let dyn_sink: Arc<dyn FrameSink> = sink.clone();
    let queues = Arc::new(TransactionQueues::new(dyn_sink.clone()));
    let handler = ChaincodeMessageHandler::new(Arc::new(chaincode), queues.clone(), dyn_sink);
    (handler, queues, sink)
}

/// A handler driven through the full handshake into the `ready` state.
pub fn ready_handler<C: Chaincode>(
    chaincode: C,
) -> (
    ChaincodeMessageHandler<C>,
    Arc<TransactionQueues>,
    Arc<RecordingSink>,
) {
    let (handler, queues, sink) = fresh_handler(chaincode);
    handler.handle_message(frame(Type::Registered, "", "", &[]));
    handler.handle_message(frame(Type::Ready, "", "", &[]));
    assert!(sink.sent().is_empty(), "handshake must not emit frames");
    (handler, queues, sink)
}

/// Succeeds every invocation with an empty payload.
pub struct NoopChaincode;

#[async_trait]
impl Chaincode for NoopChaincode {
    async fn init(&self, _stub: &mut ChaincodeStub) -> anyhow::Result<Response> {
        Ok(Response::success(Vec::new()))
    }

    async fn invoke(&self, _stub: &mut ChaincodeStub) -> anyhow::Result<Response> {
        Ok(Response::success(Vec::new()))
    }
}

/// Resolves without ever setting a status.
pub struct SilentChaincode;

#[async_trait]
impl Chaincode for SilentChaincode {
    async fn init(&self, _stub: &mut ChaincodeStub) -> anyhow::Result<Response> {
        Ok(Response::default())
    }

    async fn invoke(&self, _stub: &mut ChaincodeStub) -> anyhow::Result<Response> {
        Ok(Response::default())
    }
}
