// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::fs::File;
use std::io::{self, Read};

use clap::Args;

use loghub::console::ConsoleEmitter;
use loghub::source::filter::LogEntryFilter;
use loghub::source::filter_parser::parse_filters;
use loghub::source::{EntryReader, StreamSource};
use loghub::LogEmitter;

#[derive(Args)]
pub struct CatArgs {
    /// Input of logs: a filename, or - for STDIN
    #[arg(short = 'i', long = "in", default_value = "-")]
    input: String,

    /// Print JSON lines instead of compact lines
    #[arg(long)]
    json: bool,

    /// Filter expressions, e.g. level=w loc=server a:code>=500
    filters: Vec<String>,
}

pub fn run(args: &CatArgs) -> Result<(), Box<dyn Error>> {
    let filters = parse_filters(&args.filters)?;

    let input: Box<dyn Read> = if args.input == "-" {
        Box::new(io::stdin())
    } else {
        Box::new(File::open(&args.input)?)
    };
    let mut reader = StreamSource::new(input).skip_errors(true);

    let printer = if args.json {
        ConsoleEmitter::json_stdout()
    } else {
        ConsoleEmitter::compact(Box::new(io::stdout()))
    };

    while let Some(entry) = reader.read()? {
        if filters.matches(&entry) {
            printer.emit_log_entry(&entry);
        }
    }
    Ok(())
}
