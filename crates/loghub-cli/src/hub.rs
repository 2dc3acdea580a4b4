// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Subcommand};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tracing::info;

use loghub::config::Config;
use loghub::default_logger;
use loghub::proto::ingress_service_server::IngressServiceServer;
use loghub_server::{Connector, Dispatcher, FileStore, IngressServer, LogStore, MultiStore};

#[derive(Subcommand)]
pub enum HubCommand {
    /// Run a hub server
    #[command(alias = "s")]
    Serve(ServeArgs),

    /// Connect to a hub and stream logs
    #[command(alias = "c")]
    Connect(ConnectArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Logs ingress service (gRPC) address
    #[arg(short = 'i', long, default_value = "0.0.0.0:8000")]
    ingress_addr: String,

    /// Logs egress (TCP) listening address
    #[arg(short = 'e', long, default_value = "0.0.0.0:8080")]
    egress_addr: String,

    /// Replicate ingress logs to the current logger
    #[arg(long)]
    replicate: bool,

    /// Also persist ingress logs in per-client blob files under this directory
    #[arg(long)]
    store_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConnectArgs {
    /// Hub egress address
    #[arg(default_value = "localhost:8080")]
    addr: String,
}

pub async fn run(config: &Config, command: &HubCommand) -> Result<(), Box<dyn Error>> {
    match command {
        HubCommand::Serve(args) => serve(config, args).await,
        HubCommand::Connect(args) => connect(config, args).await,
    }
}

async fn serve(config: &Config, args: &ServeArgs) -> Result<(), Box<dyn Error>> {
    config.setup_default_logger()?;

    let grpc_listener = TcpListener::bind(&args.ingress_addr).await?;
    let egress_listener = TcpListener::bind(&args.egress_addr).await?;
    info!(addr = %grpc_listener.local_addr()?, "ingress server listening");
    info!(addr = %egress_listener.local_addr()?, "egress server listening");

    let mut dispatcher = Dispatcher::new();
    if args.replicate {
        dispatcher = dispatcher.replicate_to(Arc::new(default_logger()));
    }
    let dispatcher = Arc::new(dispatcher);

    let store: Arc<dyn LogStore> = match &args.store_dir {
        Some(dir) => Arc::new(MultiStore::new(vec![
            dispatcher.clone() as Arc<dyn LogStore>,
            Arc::new(FileStore::new(dir.clone())),
        ])),
        None => dispatcher.clone(),
    };

    let grpc = tonic::transport::Server::builder()
        .add_service(IngressServiceServer::new(IngressServer::new(store)))
        .serve_with_incoming(TcpListenerStream::new(grpc_listener));

    tokio::select! {
        result = grpc => result?,
        result = dispatcher.clone().serve(egress_listener) => result?,
    }
    Ok(())
}

async fn connect(config: &Config, args: &ConnectArgs) -> Result<(), Box<dyn Error>> {
    let connector = Connector {
        emitter: config.emitter()?,
    };
    connector.dial_and_stream(&args.addr).await?;
    Ok(())
}
