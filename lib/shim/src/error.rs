// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Typed error surface for the shim.
//!
//! Construction errors carry the literal messages the host program matches
//! on; protocol errors carry the exact diagnostics the peer expects to see
//! in ERROR frames. Internal plumbing uses `anyhow` and converges on these
//! variants at the public boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The peer address did not parse as a URL.
    #[error("Invalid URL")]
    InvalidUrl(#[source] url::ParseError),

    /// The peer address parsed but has no usable host.
    #[error("Invalid URL")]
    MissingHost,

    /// The peer address carries a scheme other than `grpc` or `grpcs`.
    #[error("Invalid protocol: {0}.  URLs must begin with grpc:// or grpcs://")]
    InvalidProtocol(String),

    /// A `grpcs://` address was given without a CA bundle.
    #[error("PEM encoded certificate is required.")]
    MissingRootCertificate,

    /// A `grpcs://` address was given without a client key.
    #[error("encoded Private key is required.")]
    MissingClientKey,

    /// A `grpcs://` address was given without a client certificate.
    #[error("encoded client certificate is required.")]
    MissingClientCertificate,

    /// The base64 client key or certificate did not decode.
    #[error("{item} is not valid base64")]
    InvalidTlsMaterial {
        item: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    /// The peer answered a request with a frame that is neither RESPONSE nor
    /// ERROR.
    #[error(
        "[{channel_id}-{txid}] Received incorrect chaincode in response to the {method}() call: type=\"{type_name}\", expecting \"RESPONSE\""
    )]
    UnexpectedResponseType {
        channel_id: String,
        txid: String,
        method: &'static str,
        type_name: String,
    },

    /// The peer answered a request with an ERROR frame; the message is the
    /// frame payload interpreted as UTF-8.
    #[error("{0}")]
    Peer(String),

    /// Writing a frame to the transport failed synchronously.
    #[error("failed to send to peer stream: {0}")]
    Send(String),

    /// The stream ended while a request was outstanding.
    #[error("chaincode stream terminated")]
    StreamTerminated,

    /// A peer response payload did not decode as its protobuf body.
    #[error("failed to decode peer response")]
    Decode(#[from] prost::DecodeError),
}
