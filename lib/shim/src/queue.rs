// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Per-transaction message queues.
//!
//! One FIFO per transaction key, keyed by `channel_id` + `txid`. Invariants:
//! only the head of a queue has been written to the stream, and a queue is
//! present in the map iff it is non-empty. Enqueueing onto an empty queue
//! writes the new head immediately; completing the head writes the next
//! entry or deletes the queue. Responses for unknown keys are dropped.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::oneshot;

use crate::error::Error;
use crate::protos::ChaincodeMessage;
use crate::transport::FrameSink;

/// Completion handle for one outstanding peer request. The queue owns the
/// sender; the task that issued the request awaits the receiver.
pub type Completion = oneshot::Sender<Result<ChaincodeMessage, Error>>;

/// The routing identity of a frame. Two concurrent transactions never share
/// a key; that is the peer's contract.
pub fn tx_key(channel_id: &str, txid: &str) -> String {
    format!("{channel_id}{txid}")
}

#[derive(Debug)]
struct PendingRequest {
    message: ChaincodeMessage,
    /// Taken when the request completes or fails; a spent entry can still
    /// occupy the head slot after a synchronous send failure.
    completion: Option<Completion>,
}

/// Queue manager enforcing at-most-one in-flight request per transaction.
pub struct TransactionQueues {
    queues: DashMap<String, VecDeque<PendingRequest>>,
    sink: Arc<dyn FrameSink>,
}

impl fmt::Debug for TransactionQueues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionQueues")
            .field("queues", &self.queues)
            .finish_non_exhaustive()
    }
}

impl TransactionQueues {
    pub fn new(sink: Arc<dyn FrameSink>) -> Self {
        Self {
            queues: DashMap::new(),
            sink,
        }
    }

    /// Appends a request to its transaction's queue. If the queue was empty
    /// the new head is written to the stream before this returns. Never
    /// blocks.
    pub fn enqueue(&self, message: ChaincodeMessage, completion: Completion) {
        let key = tx_key(&message.channel_id, &message.txid);
        let mut queue = self.queues.entry(key).or_default();
        queue.push_back(PendingRequest {
            message,
            completion: Some(completion),
        });
        if queue.len() == 1 {
            self.send_head(&mut queue);
        }
    }

    /// Routes an inbound RESPONSE/ERROR frame to the head request of its
    /// transaction's queue. Frames for absent keys are dropped: late or
    /// duplicate responses, or an already-torn-down transaction.
    pub fn on_response(&self, frame: ChaincodeMessage) {
        let key = tx_key(&frame.channel_id, &frame.txid);
        let Some(mut queue) = self.queues.get_mut(&key) else {
            tracing::trace!(%key, "dropping response with no pending request");
            return;
        };
        let Some(mut head) = queue.pop_front() else {
            // Unreachable while the absent-iff-empty invariant holds.
            tracing::warn!(%key, "response found an empty queue");
            return;
        };
        if let Some(completion) = head.completion.take() {
            let _ = completion.send(Ok(frame));
        }

        if queue.is_empty() {
            drop(queue);
            self.queues.remove_if(&key, |_, queue| queue.is_empty());
        } else {
            self.send_head(&mut queue);
        }
    }

    /// Fails every outstanding request. Called when the stream ends; there
    /// is no peer left to answer.
    pub fn fail_all(&self) {
        self.queues.retain(|_, queue| {
            for mut pending in queue.drain(..) {
                if let Some(completion) = pending.completion.take() {
                    let _ = completion.send(Err(Error::StreamTerminated));
                }
            }
            false
        });
    }

    /// Writes the head of `queue` to the stream. On a synchronous write
    /// failure the head's completion is failed with the transport error but
    /// the entry stays queued, so a late peer response drains it and
    /// advances the queue; see DESIGN.md.
    fn send_head(&self, queue: &mut VecDeque<PendingRequest>) {
        let Some(head) = queue.front_mut() else {
            return;
        };
        if let Err(err) = self.sink.send(head.message.clone()) {
            tracing::warn!(%err, txid = %head.message.txid, "failed to write request frame");
            if let Some(completion) = head.completion.take() {
                let _ = completion.send(Err(err));
            }
        }
    }

    #[cfg(test)]
    fn queue_len(&self, channel_id: &str, txid: &str) -> Option<usize> {
        self.queues
            .get(&tx_key(channel_id, txid))
            .map(|queue| queue.len())
    }
}
