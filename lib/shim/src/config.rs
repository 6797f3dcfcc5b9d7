// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Client configuration.
//!
//! Carries the recognized connection options plus the chaincode identity and
//! the TLS material for `grpcs://` peers. `request_timeout` is surfaced to
//! the host program but the protocol core does not enforce a per-request
//! deadline; see DESIGN.md.

use derive_builder::Builder;
use std::time::Duration;

/// Default timeout surfaced for high-level operations (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Default peer connect timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned")]
pub struct ClientConfig {
    /// Name the shim registers under; the payload of the REGISTER frame.
    #[builder(setter(into))]
    pub chaincode_name: String,

    /// Applied to high-level operations, not to the stream itself.
    #[builder(default = "DEFAULT_REQUEST_TIMEOUT")]
    pub request_timeout: Duration,

    #[builder(default = "DEFAULT_CONNECT_TIMEOUT")]
    pub connect_timeout: Duration,

    /// Overrides both the name the peer's TLS certificate is verified
    /// against and the default authority sent on the channel's requests.
    #[builder(setter(into, strip_option), default)]
    pub ssl_target_name_override: Option<String>,

    /// `grpc.max_send_message_length`; unlimited when unset.
    #[builder(default)]
    pub max_send_message_length: Option<usize>,

    /// `grpc.max_receive_message_length`; unlimited when unset.
    #[builder(default)]
    pub max_receive_message_length: Option<usize>,

    /// `grpc.keepalive_time_ms`.
    #[builder(default)]
    pub keepalive_time_ms: Option<u64>,

    /// `grpc.keepalive_timeout_ms`.
    #[builder(default)]
    pub keepalive_timeout_ms: Option<u64>,

    /// `grpc.keepalive_permit_without_calls`.
    #[builder(default)]
    pub keepalive_permit_without_calls: Option<bool>,

    /// `grpc.http2.min_time_between_pings_ms`. Accepted for interface
    /// compatibility; client channels cannot police their own ping cadence,
    /// so the value is recorded but not applied.
    #[builder(default)]
    pub http2_min_time_between_pings_ms: Option<u64>,

    /// `grpc.http2.max_pings_without_data`. Accepted for interface
    /// compatibility, not applied; see above.
    #[builder(default)]
    pub http2_max_pings_without_data: Option<u32>,

    /// PEM-encoded CA bundle, mandatory for `grpcs://` peers.
    #[builder(setter(into, strip_option), default)]
    pub root_certs: Option<String>,

    /// Base64-encoded PEM client key, mandatory for `grpcs://` peers.
    #[builder(setter(into, strip_option), default)]
    pub client_key: Option<String>,

    /// Base64-encoded PEM client certificate, mandatory for `grpcs://` peers.
    #[builder(setter(into, strip_option), default)]
    pub client_cert: Option<String>,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::builder()
            .chaincode_name("mycc")
            .build()
            .unwrap();
        assert_eq!(config.chaincode_name, "mycc");
        assert_eq!(config.request_timeout, Duration::from_millis(30_000));
        assert!(config.ssl_target_name_override.is_none());
        assert!(config.root_certs.is_none());
        assert!(config.max_send_message_length.is_none());
    }

    #[test]
    fn test_chaincode_name_is_required() {
        assert!(ClientConfig::builder().build().is_err());
    }

    #[test]
    fn test_builder_options() {
        let config = ClientConfig::builder()
            .chaincode_name("mycc")
            .request_timeout(Duration::from_secs(5))
            .ssl_target_name_override("peer0.example.com")
            .keepalive_time_ms(Some(110_000))
            .build()
            .unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(
            config.ssl_target_name_override.as_deref(),
            Some("peer0.example.com")
        );
        assert_eq!(config.keepalive_time_ms, Some(110_000));
    }
}
