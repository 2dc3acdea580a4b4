// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Fan-out of accepted entries to downstream TCP consumers.

mod connector;
mod dispatcher;

pub use connector::Connector;
pub use dispatcher::Dispatcher;
