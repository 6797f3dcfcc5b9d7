// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The user-code capability surface.
//!
//! A chaincode is two operations, each handed the per-transaction
//! [`ChaincodeStub`] and expected to produce a [`Response`]. An `Err` return
//! is reported to the peer as an ERROR frame carrying the error's message;
//! an `Ok` response without a status set is reported as a COMPLETED frame
//! carrying an explicit error status, because the peer requires one.

use async_trait::async_trait;

use crate::protos::Response;
use crate::stub::ChaincodeStub;

/// Successful transaction status.
pub const OK: i32 = 200;

/// Failed transaction status.
pub const ERROR: i32 = 500;

/// User-supplied smart-contract logic.
///
/// Implementations run concurrently across transactions; within one
/// transaction the invocation runs to completion before its outcome is
/// written back to the peer.
#[async_trait]
pub trait Chaincode: Send + Sync + 'static {
    /// Called when the chaincode is instantiated or upgraded.
    async fn init(&self, stub: &mut ChaincodeStub) -> anyhow::Result<Response>;

    /// Called for every transaction proposal.
    async fn invoke(&self, stub: &mut ChaincodeStub) -> anyhow::Result<Response>;
}

impl Response {
    /// A success response carrying `payload` back to the caller.
    pub fn success(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            status: OK,
            message: String::new(),
            payload: payload.into(),
        }
    }

    /// A failure response carrying a diagnostic message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ERROR,
            message: message.into(),
            payload: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response() {
        let response = Response::success(b"value".to_vec());
        assert_eq!(response.status, OK);
        assert_eq!(response.payload, b"value");
        assert!(response.message.is_empty());
    }

    #[test]
    fn test_error_response() {
        let response = Response::error("asset not found");
        assert_eq!(response.status, ERROR);
        assert_eq!(response.message, "asset not found");
        assert!(response.payload.is_empty());
    }

    #[test]
    fn test_default_response_has_no_status() {
        // A defaulted response is the "has not called success or error"
        // case the dispatcher reports to the peer.
        assert_eq!(Response::default().status, 0);
    }
}
