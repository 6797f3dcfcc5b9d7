// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Cursors over peer-side query results.
//!
//! Range scans, rich queries and history scans answer with the first page of
//! an open peer cursor. These iterators are lazy, finite and non-restartable:
//! entries are decoded from the buffered page, further pages are pulled with
//! QUERY_STATE_NEXT, and the peer cursor is released with QUERY_STATE_CLOSE.
//! Dropping an unclosed iterator spawns a best-effort close.

use std::collections::VecDeque;
use std::marker::PhantomData;

use prost::Message;

use crate::error::Error;
use crate::peer::PeerRequester;
use crate::protos::{KeyModification, Kv, QueryResponse, QueryResultBytes};

/// Iterator over key/value records from a range scan or rich query.
pub type StateQueryIterator = QueryIterator<Kv>;

/// Iterator over the historical versions of a key.
pub type HistoryQueryIterator = QueryIterator<KeyModification>;

pub struct QueryIterator<T: Message + Default> {
    requester: PeerRequester,
    id: String,
    results: VecDeque<QueryResultBytes>,
    has_more: bool,
    closed: bool,
    _record: PhantomData<T>,
}

impl<T: Message + Default> QueryIterator<T> {
    pub(crate) fn new(requester: PeerRequester, response: QueryResponse) -> Self {
        Self {
            requester,
            id: response.id,
            results: response.results.into(),
            has_more: response.has_more,
            closed: false,
            _record: PhantomData,
        }
    }

    /// Yields the next record, fetching further pages from the peer as the
    /// buffered page runs dry. Returns `None` once the cursor is exhausted.
    pub async fn next_entry(&mut self) -> Result<Option<T>, Error> {
        loop {
            if let Some(record) = self.results.pop_front() {
                return Ok(Some(T::decode(record.result_bytes.as_slice())?));
            }
            if !self.has_more {
                return Ok(None);
            }
            let page = self.requester.query_state_next(&self.id).await?;
            self.has_more = page.has_more;
            self.results = page.results.into();
        }
    }

    /// Releases the peer-side cursor. Idempotent; only the first call talks
    /// to the peer.
    pub async fn close(&mut self) -> Result<(), Error> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.requester.query_state_close(&self.id).await.map(|_| ())
    }
}

impl<T: Message + Default> Drop for QueryIterator<T> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Best-effort release of the peer cursor when the owner forgot to
        // close; needs a live runtime to issue the call from.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let requester = self.requester.clone();
            let id = std::mem::take(&mut self.id);
            handle.spawn(async move {
                if let Err(err) = requester.query_state_close(&id).await {
                    tracing::debug!(%err, "failed to close dropped query cursor");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protos::ChaincodeMessage;
    use crate::queue::TransactionQueues;
    use crate::transport::FrameSink;
    use std::sync::Arc;

    struct NullSink;

    impl FrameSink for NullSink {
        fn send(&self, _frame: ChaincodeMessage) -> Result<(), Error> {
            Ok(())
        }
    }

    fn iterator_over(records: Vec<Kv>, has_more: bool) -> StateQueryIterator {
        let requester = PeerRequester::new(
            Arc::new(TransactionQueues::new(Arc::new(NullSink))),
            "ch".into(),
            "tx".into(),
        );
        let response = QueryResponse {
            results: records
                .into_iter()
                .map(|kv| QueryResultBytes {
                    result_bytes: kv.encode_to_vec(),
                })
                .collect(),
            has_more,
            id: "cursor-1".into(),
            metadata: Vec::new(),
        };
        QueryIterator::new(requester, response)
    }

    #[tokio::test]
    async fn test_yields_buffered_page_then_ends() {
        let mut iter = iterator_over(
            vec![
                Kv {
                    namespace: "ns".into(),
                    key: "a".into(),
                    value: b"1".to_vec(),
                },
                Kv {
                    namespace: "ns".into(),
                    key: "b".into(),
                    value: b"2".to_vec(),
                },
            ],
            false,
        );

        let first = iter.next_entry().await.unwrap().unwrap();
        assert_eq!(first.key, "a");
        let second = iter.next_entry().await.unwrap().unwrap();
        assert_eq!(second.key, "b");
        assert!(iter.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut iter = iterator_over(Vec::new(), false);
        // The null sink never answers, so the first close times out awaiting
        // the peer; the closed flag is set before the await point.
        let _ = tokio::time::timeout(std::time::Duration::from_millis(10), iter.close()).await;
        // Second close must be a local no-op.
        iter.close().await.unwrap();
    }
}
