// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The hub server side: a gRPC ingress service accepting streamed batches
//! from many producers, storage abstractions, and the dispatcher that
//! re-broadcasts accepted entries to TCP consumers.

pub mod filestore;
pub mod hub;
pub mod ingress;
pub mod store;

pub use filestore::FileStore;
pub use hub::{Connector, Dispatcher};
pub use ingress::IngressServer;
pub use store::{BatchWriter, LogStore, MultiStore, StoreError};
