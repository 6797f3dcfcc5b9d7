// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Chaincode shim.
//!
//! Connects user-supplied smart-contract logic to a blockchain peer over a
//! single bidirectional gRPC stream. The shim registers itself with the
//! peer, receives transaction invocations, and performs ledger operations
//! by asking the peer over the same stream; within one transaction those
//! requests are strictly serialized, across transactions they interleave.
//!
//! ```rust,ignore
//! use chaincode_shim::{Chaincode, ChaincodeStub, ChaincodeSupportClient, ClientConfig, Response};
//!
//! struct Asset;
//!
//! #[chaincode_shim::async_trait]
//! impl Chaincode for Asset {
//!     async fn init(&self, _stub: &mut ChaincodeStub) -> anyhow::Result<Response> {
//!         Ok(Response::success(Vec::new()))
//!     }
//!
//!     async fn invoke(&self, stub: &mut ChaincodeStub) -> anyhow::Result<Response> {
//!         let value = stub.get_state("theKey").await?;
//!         Ok(Response::success(value))
//!     }
//! }
//!
//! # async fn run() -> anyhow::Result<()> {
//! chaincode_shim::logging::init();
//! let config = ClientConfig::builder().chaincode_name("asset").build()?;
//! let client = ChaincodeSupportClient::new(Asset, "grpc://peer:7052", config)?;
//! client.start().await
//! # }
//! ```

pub mod chaincode;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod iterators;
pub mod logging;
pub mod peer;
pub mod protos;
pub mod queue;
pub mod stub;
pub mod transport;

pub use async_trait::async_trait;

pub use chaincode::{Chaincode, ERROR, OK};
pub use client::ChaincodeSupportClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::Error;
pub use handler::ChaincodeMessageHandler;
pub use iterators::{HistoryQueryIterator, StateQueryIterator};
pub use peer::PeerRequester;
pub use protos::{ChaincodeEvent, Response};
pub use stub::ChaincodeStub;
pub use transport::FrameSink;
