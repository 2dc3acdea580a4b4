// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Random log generator for demos and soak testing a hub.

use std::error::Error;
use std::time::Duration;

use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use loghub::config::Config;
use loghub::{default_logger, Attribute, Logger, SpanInfo};

const WORDS: &[&str] = &[
    "alpha", "beacon", "cargo", "delta", "ember", "fjord", "glacier", "harbor",
    "island", "jetty", "krill", "lagoon", "meadow", "nebula", "orchid", "prairie",
    "quarry", "ridge", "summit", "tundra", "umbra", "valley", "willow", "yonder",
    "zephyr", "basalt", "cinder", "drift", "estuary", "fathom", "grotto", "heath",
];

#[derive(Args)]
pub struct GenArgs {
    /// Generate rate: logs/min
    #[arg(long, default_value_t = 80)]
    rate: u32,

    /// Maximum span depth
    #[arg(long, default_value_t = 3)]
    max_span_depth: usize,

    /// Number of words per log
    #[arg(long, default_value_t = 10)]
    num_words: usize,

    /// Number of attribute sets
    #[arg(long, default_value_t = 8)]
    num_attrsets: usize,

    /// Number of attributes per set
    #[arg(long, default_value_t = 6)]
    num_attrs: usize,

    /// Exit instantly without completing spans
    #[arg(long)]
    instant_exit: bool,
}

#[derive(Clone, Copy)]
enum AttrKind {
    Str,
    Int,
    Bool,
}

fn words(rng: &mut StdRng, count: usize) -> String {
    let mut out = String::new();
    for n in 0..count {
        if n > 0 {
            out.push(' ');
        }
        out.push_str(WORDS[rng.gen_range(0..WORDS.len())]);
    }
    out
}

fn attrs_from(rng: &mut StdRng, set: &[(String, AttrKind)]) -> Vec<Attribute> {
    set.iter()
        .map(|(name, kind)| match kind {
            AttrKind::Str => Attribute::str(name.clone(), words(rng, 1)),
            AttrKind::Int => Attribute::int(name.clone(), rng.gen_range(0..100)),
            AttrKind::Bool => Attribute::bool(name.clone(), rng.gen_range(0..2) > 0),
        })
        .collect()
}

pub async fn run(config: &Config, args: &GenArgs) -> Result<(), Box<dyn Error>> {
    config.setup_default_logger()?;

    let mut rng = StdRng::from_entropy();
    let avg_delay_ns = 60_000_000_000u64 / u64::from(args.rate.max(1));
    let drift = avg_delay_ns / 2;

    let attr_sets: Vec<Vec<(String, AttrKind)>> = (0..args.num_attrsets.max(1))
        .map(|_| {
            (0..args.num_attrs)
                .map(|_| {
                    let kind = match rng.gen_range(0..3) {
                        0 => AttrKind::Str,
                        1 => AttrKind::Int,
                        _ => AttrKind::Bool,
                    };
                    (words(&mut rng, 1), kind)
                })
                .collect()
        })
        .collect();

    let mut span_stack: Vec<Logger> = vec![default_logger()];

    loop {
        let delay = avg_delay_ns - drift + rng.gen_range(0..drift.max(1) * 2);
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                if !args.instant_exit {
                    default_logger().warning(&"EXITING").print("EXITING");
                    while span_stack.len() > 1 {
                        if let Some(logger) = span_stack.pop() {
                            logger.end_span();
                        }
                    }
                }
                return Ok(());
            }
            _ = tokio::time::sleep(Duration::from_nanos(delay)) => {}
        }

        let logger = span_stack[span_stack.len() - 1].clone();
        if rng.gen_range(0..10) > 6 {
            if span_stack.len() < args.max_span_depth + 1 && rng.gen_range(0..2) > 0 {
                let name = words(&mut rng, 2).replace(' ', "/");
                let set = &attr_sets[rng.gen_range(0..attr_sets.len())];
                let attrs = attrs_from(&mut rng, set);
                span_stack.push(logger.start_span(SpanInfo::named(name), attrs));
                continue;
            }
            if span_stack.len() > 1 {
                logger.end_span();
                span_stack.pop();
                continue;
            }
        }

        let printer = logger.printer();
        let printer = match rng.gen_range(0..10) {
            2..=4 => printer.info(),
            5 | 6 => printer.warning(&words(&mut rng, 3)),
            7 | 8 => printer.error(&words(&mut rng, 3)),
            9 => printer.critical(&words(&mut rng, 3)),
            _ => printer,
        };
        printer.print(words(&mut rng, args.num_words));
    }
}
