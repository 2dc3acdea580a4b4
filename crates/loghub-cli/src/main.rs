// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod cat;
mod gen;
mod hub;

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use loghub::config::Config;

#[derive(Parser)]
#[command(name = "loghub")]
#[command(about = "Tools for the loghub structured log pipeline")]
struct Cli {
    #[command(flatten)]
    logs: LogsFlags,

    #[command(subcommand)]
    command: Command,
}

/// Flags configuring the emitter chain behind the default logger; every
/// flag also binds the matching LOGS_* environment variable.
#[derive(Args, Clone)]
struct LogsFlags {
    /// Logs client name
    #[arg(long = "logs-client", env = "LOGS_CLIENT", default_value = "")]
    client: String,

    /// Logs console printer (default | json | none)
    #[arg(long = "logs-printer", env = "LOGS_PRINTER", default_value = "")]
    printer: String,

    /// Blob filename pattern for writing binary encoded logs to files
    #[arg(long = "logs-blob-file", env = "LOGS_BLOB_FILE", default_value = "")]
    blob_file: String,

    /// Flush blob files after every record
    #[arg(long = "logs-blob-sync")]
    blob_sync: bool,

    /// Blob file size limit, 0 means no limit
    #[arg(long = "logs-blob-sizelimit", default_value_t = 0)]
    blob_size_limit: u64,

    /// Ingress server address for remote streaming
    #[arg(long = "logs-remote-addr", env = "LOGS_REMOTE_ADDR", default_value = "")]
    remote_addr: String,

    /// Chunked emitter: max buffered bytes of unstreamed logs
    #[arg(
        long = "logs-chunked-buffer-max",
        env = "LOGS_CHUNKED_BUFFER_MAX",
        default_value_t = 1 << 20
    )]
    chunked_buffer_max: usize,

    /// Chunked emitter: max bytes in one batch
    #[arg(
        long = "logs-chunked-batch-max",
        env = "LOGS_CHUNKED_BATCH_MAX",
        default_value_t = 1 << 14
    )]
    chunked_batch_max: usize,

    /// Chunked emitter: batch period in milliseconds
    #[arg(long = "logs-chunked-collect-period", default_value_t = 1000)]
    chunked_collect_period_ms: u64,
}

impl LogsFlags {
    fn to_config(&self) -> Config {
        Config {
            client_name: self.client.clone(),
            console_printer: self.printer.clone(),
            blob_file: self.blob_file.clone(),
            blob_sync: self.blob_sync,
            blob_size_limit: self.blob_size_limit,
            remote_addr: self.remote_addr.clone(),
            chunked_max_buffer: self.chunked_buffer_max,
            chunked_max_batch: self.chunked_batch_max,
            chunked_collect_period: Duration::from_millis(self.chunked_collect_period_ms),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Cat logs with filters
    Cat(cat::CatArgs),

    /// Log hub related functions
    Hub {
        #[command(subcommand)]
        command: hub::HubCommand,
    },

    /// Generate random logs
    Gen(gen::GenArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = cli.logs.to_config();
    let result = match &cli.command {
        Command::Cat(args) => cat::run(args),
        Command::Hub { command } => hub::run(&config, command).await,
        Command::Gen(args) => gen::run(&config, args).await,
    };
    if let Err(err) = result {
        eprintln!("loghub: {err}");
        std::process::exit(1);
    }
}
