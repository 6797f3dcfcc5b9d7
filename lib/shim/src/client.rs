// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Host-program surface.
//!
//! `ChaincodeSupportClient` owns one connection to the peer: it validates
//! the address up front, dials on `start`, registers, and then drives the
//! inbound loop until the peer goes away or the caller cancels. The shim
//! never reconnects on its own; the host restarts the process.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use prost::Message;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::chaincode::Chaincode;
use crate::config::ClientConfig;
use crate::error::Error;
use crate::handler::ChaincodeMessageHandler;
use crate::protos::chaincode_message::Type;
use crate::protos::{ChaincodeId, ChaincodeMessage};
use crate::queue::TransactionQueues;
use crate::transport::{self, PeerAddress};

pub struct ChaincodeSupportClient<C: Chaincode> {
    chaincode: Arc<C>,
    address: PeerAddress,
    config: ClientConfig,
}

impl<C: Chaincode> Clone for ChaincodeSupportClient<C> {
    fn clone(&self) -> Self {
        Self {
            chaincode: self.chaincode.clone(),
            address: self.address.clone(),
            config: self.config.clone(),
        }
    }
}

impl<C: Chaincode> fmt::Display for ChaincodeSupportClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChaincodeSupportClient : {{url:{}}}", self.address.url())
    }
}

impl<C: Chaincode> fmt::Debug for ChaincodeSupportClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChaincodeSupportClient")
            .field("address", &self.address)
            .field("config", &self.config)
            .finish()
    }
}

impl<C: Chaincode> ChaincodeSupportClient<C> {
    /// Validates the peer address and, for `grpcs://`, the TLS material.
    /// Nothing is dialled until [`start`](Self::start).
    pub fn new(chaincode: C, url: &str, config: ClientConfig) -> Result<Self, Error> {
        let address = PeerAddress::parse(url, &config)?;
        Ok(Self {
            chaincode: Arc::new(chaincode),
            address,
            config,
        })
    }

    /// Connects and serves until the stream ends.
    pub async fn start(&self) -> anyhow::Result<()> {
        self.run(CancellationToken::new()).await
    }

    /// Runs the connection on a background task.
    pub fn spawn(&self, cancel_token: CancellationToken) -> JoinHandle<anyhow::Result<()>> {
        let client = self.clone();
        tokio::spawn(async move { client.run(cancel_token).await })
    }

    /// Connects, registers, and pumps inbound frames into the handler until
    /// the peer closes the stream, the transport fails, or `cancel_token`
    /// fires. Outstanding requests are failed on the way out.
    pub async fn run(&self, cancel_token: CancellationToken) -> anyhow::Result<()> {
        tracing::info!(client = %self, "connecting to peer");
        let connection = transport::connect(&self.address, &self.config).await?;

        // REGISTER is the first outbound frame on every connection.
        let register = ChaincodeMessage {
            r#type: Type::Register as i32,
            payload: ChaincodeId {
                name: self.config.chaincode_name.clone(),
                ..Default::default()
            }
            .encode_to_vec(),
            ..Default::default()
        };
        connection.sink.send(register)?;

        let queues = Arc::new(TransactionQueues::new(connection.sink.clone()));
        let handler =
            ChaincodeMessageHandler::new(self.chaincode.clone(), queues.clone(), connection.sink);

        let mut inbound = connection.inbound;
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    tracing::info!("shutdown requested; closing peer stream");
                    break;
                }
                frame = inbound.next() => match frame {
                    Some(Ok(message)) => handler.handle_message(message),
                    Some(Err(status)) => {
                        tracing::error!(%status, "peer stream failed");
                        break;
                    }
                    None => {
                        tracing::info!("peer closed the stream");
                        break;
                    }
                },
            }
        }

        // No peer left to answer; wake every suspended transaction.
        queues.fail_all();
        Ok(())
    }
}
