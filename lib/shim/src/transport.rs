// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Stream transport to the peer's chaincode-support endpoint.
//!
//! Dials `grpc://` (insecure) or `grpcs://` (mutual TLS) and opens the
//! long-lived bidirectional Register stream. The outbound direction is an
//! unbounded mpsc channel adapted into the request stream, so writes are
//! non-blocking and fail synchronously once the stream is gone; the inbound
//! direction is the tonic response stream, drained by the client loop.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::codegen::http::Uri;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Identity};
use tonic::Streaming;
use url::Url;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::protos::ChaincodeMessage;

/// The single RPC this shim speaks.
const REGISTER_PATH: &str = "/protos.ChaincodeSupport/Register";

/// Write side of the peer stream.
///
/// All frame emission funnels through one implementation per connection;
/// `send` must not block and must fail synchronously when the transport is
/// dead.
pub trait FrameSink: Send + Sync + 'static {
    fn send(&self, frame: ChaincodeMessage) -> Result<(), Error>;
}

/// [`FrameSink`] backed by the outbound mpsc channel of a live stream.
pub(crate) struct ChannelSink {
    tx: mpsc::UnboundedSender<ChaincodeMessage>,
}

impl FrameSink for ChannelSink {
    fn send(&self, frame: ChaincodeMessage) -> Result<(), Error> {
        self.tx
            .send(frame)
            .map_err(|_| Error::Send("peer stream is closed".into()))
    }
}

/// Mutual-TLS material, decoded and ready to hand to the channel builder.
#[derive(Clone, Debug)]
pub(crate) struct TlsMaterial {
    root_certs: String,
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
}

/// A validated peer address.
///
/// Host case is preserved verbatim; `grpc` and `grpcs` are non-special
/// schemes so the URL parser leaves the authority untouched.
#[derive(Clone, Debug)]
pub(crate) struct PeerAddress {
    url: String,
    authority: String,
    tls: Option<TlsMaterial>,
}

impl PeerAddress {
    /// Validates the peer URL and, for `grpcs://`, the TLS material: CA
    /// bundle, client key, client certificate, checked in that order.
    pub fn parse(url_str: &str, config: &ClientConfig) -> Result<Self, Error> {
        let url = Url::parse(url_str).map_err(Error::InvalidUrl)?;
        let secure = match url.scheme() {
            "grpc" => false,
            "grpcs" => true,
            other => return Err(Error::InvalidProtocol(other.to_string())),
        };
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or(Error::MissingHost)?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let tls = if secure {
            let root_certs = config
                .root_certs
                .clone()
                .ok_or(Error::MissingRootCertificate)?;
            let client_key = config.client_key.as_ref().ok_or(Error::MissingClientKey)?;
            let client_cert = config
                .client_cert
                .as_ref()
                .ok_or(Error::MissingClientCertificate)?;
            let key_pem = decode_base64("client key", client_key)?;
            let cert_pem = decode_base64("client certificate", client_cert)?;
            Some(TlsMaterial {
                root_certs,
                cert_pem,
                key_pem,
            })
        } else {
            None
        };

        Ok(Self {
            url: url_str.to_string(),
            authority,
            tls,
        })
    }

    /// The address exactly as the host program supplied it.
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn decode_base64(item: &'static str, value: &str) -> Result<Vec<u8>, Error> {
    base64::engine::general_purpose::STANDARD
        .decode(value.trim())
        .map_err(|source| Error::InvalidTlsMaterial { item, source })
}

/// A live bidirectional stream to the peer.
pub(crate) struct PeerConnection {
    pub sink: Arc<dyn FrameSink>,
    pub inbound: Streaming<ChaincodeMessage>,
}

/// Dials the peer and opens the Register stream.
pub(crate) async fn connect(
    address: &PeerAddress,
    config: &ClientConfig,
) -> anyhow::Result<PeerConnection> {
    let scheme = if address.tls.is_some() { "https" } else { "http" };
    let mut endpoint = Channel::from_shared(format!("{scheme}://{}", address.authority))?
        .tcp_nodelay(true)
        .connect_timeout(config.connect_timeout);

    if let Some(ms) = config.keepalive_time_ms {
        endpoint = endpoint.http2_keep_alive_interval(Duration::from_millis(ms));
    }
    if let Some(ms) = config.keepalive_timeout_ms {
        endpoint = endpoint.keep_alive_timeout(Duration::from_millis(ms));
    }
    if let Some(permit) = config.keepalive_permit_without_calls {
        endpoint = endpoint.keep_alive_while_idle(permit);
    }

    // The override names both halves of the peer's identity: the HTTP/2
    // :authority on every request and, below, the TLS verification name.
    if let Some(domain) = &config.ssl_target_name_override {
        let origin = format!("{scheme}://{domain}").parse::<Uri>()?;
        endpoint = endpoint.origin(origin);
    }

    if let Some(tls) = &address.tls {
        let mut tls_config = ClientTlsConfig::new()
            .ca_certificate(Certificate::from_pem(&tls.root_certs))
            .identity(Identity::from_pem(&tls.cert_pem, &tls.key_pem));
        if let Some(domain) = &config.ssl_target_name_override {
            tls_config = tls_config.domain_name(domain);
        }
        endpoint = endpoint.tls_config(tls_config)?;
    }

    tracing::debug!(authority = %address.authority, secure = address.tls.is_some(), "connecting to peer");
    let channel = endpoint.connect().await?;

    let (tx, rx) = mpsc::unbounded_channel();
    let outbound = UnboundedReceiverStream::new(rx);
    let inbound = open_register_stream(channel, outbound, config).await?;
    tracing::debug!(authority = %address.authority, "chaincode-support stream established");

    Ok(PeerConnection {
        sink: Arc::new(ChannelSink { tx }),
        inbound,
    })
}

/// Issues the bidirectional streaming call the way a generated client would:
/// raw `Grpc` plumbing, a prost codec, and the static method path.
async fn open_register_stream(
    channel: Channel,
    outbound: UnboundedReceiverStream<ChaincodeMessage>,
    config: &ClientConfig,
) -> anyhow::Result<Streaming<ChaincodeMessage>> {
    let mut grpc = tonic::client::Grpc::new(channel);
    if let Some(limit) = config.max_send_message_length {
        grpc = grpc.max_encoding_message_size(limit);
    }
    if let Some(limit) = config.max_receive_message_length {
        grpc = grpc.max_decoding_message_size(limit);
    }
    grpc.ready()
        .await
        .map_err(|e| anyhow::anyhow!("peer endpoint not ready: {e}"))?;

    let codec: tonic::codec::ProstCodec<ChaincodeMessage, ChaincodeMessage> =
        tonic::codec::ProstCodec::default();
    let path = PathAndQuery::from_static(REGISTER_PATH);
    let response = grpc
        .streaming(tonic::Request::new(outbound), path, codec)
        .await?;
    Ok(response.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    fn plain_config() -> ClientConfig {
        ClientConfig::builder()
            .chaincode_name("mycc")
            .build()
            .unwrap()
    }

    #[test]
    fn test_parse_insecure_url() {
        let address = PeerAddress::parse("grpc://localhost:7051", &plain_config()).unwrap();
        assert_eq!(address.authority, "localhost:7051");
        assert!(address.tls.is_none());
        assert_eq!(address.url(), "grpc://localhost:7051");
    }

    #[test]
    fn test_parse_preserves_host_case() {
        let address = PeerAddress::parse("grpc://Peer0.Example.COM:7051", &plain_config()).unwrap();
        assert_eq!(address.authority, "Peer0.Example.COM:7051");
    }

    #[test]
    fn test_parse_rejects_unparseable_url() {
        let err = PeerAddress::parse("::not a url::", &plain_config()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid URL");
    }

    #[test]
    fn test_parse_rejects_foreign_scheme() {
        let err = PeerAddress::parse("http://localhost:7051", &plain_config()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid protocol: http.  URLs must begin with grpc:// or grpcs://"
        );
    }

    #[test]
    fn test_secure_url_requires_tls_material_in_order() {
        let base = || ClientConfig::builder().chaincode_name("mycc");

        let err = PeerAddress::parse("grpcs://localhost:7051", &base().build().unwrap());
        assert_eq!(
            err.unwrap_err().to_string(),
            "PEM encoded certificate is required."
        );

        let err = PeerAddress::parse(
            "grpcs://localhost:7051",
            &base().root_certs("-----BEGIN CERTIFICATE-----").build().unwrap(),
        );
        assert_eq!(
            err.unwrap_err().to_string(),
            "encoded Private key is required."
        );

        let err = PeerAddress::parse(
            "grpcs://localhost:7051",
            &base()
                .root_certs("-----BEGIN CERTIFICATE-----")
                .client_key(base64::engine::general_purpose::STANDARD.encode("key-pem"))
                .build()
                .unwrap(),
        );
        assert_eq!(
            err.unwrap_err().to_string(),
            "encoded client certificate is required."
        );
    }

    #[test]
    fn test_secure_url_decodes_material() {
        let engine = base64::engine::general_purpose::STANDARD;
        let config = ClientConfig::builder()
            .chaincode_name("mycc")
            .root_certs("ca-pem")
            .client_key(engine.encode("key-pem"))
            .client_cert(engine.encode("cert-pem"))
            .build()
            .unwrap();
        let address = PeerAddress::parse("grpcs://localhost:7051", &config).unwrap();
        let tls = address.tls.unwrap();
        assert_eq!(tls.root_certs, "ca-pem");
        assert_eq!(tls.key_pem, b"key-pem");
        assert_eq!(tls.cert_pem, b"cert-pem");
    }

    #[test]
    fn test_rejects_bad_base64_material() {
        let config = ClientConfig::builder()
            .chaincode_name("mycc")
            .root_certs("ca-pem")
            .client_key("%%%not-base64%%%")
            .client_cert("also bad")
            .build()
            .unwrap();
        let err = PeerAddress::parse("grpcs://localhost:7051", &config).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTlsMaterial {
                item: "client key",
                ..
            }
        ));
    }
}
