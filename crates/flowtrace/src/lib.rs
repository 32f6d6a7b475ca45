//! Flowtrace binary: command line parsing, logging, the Linux NFQUEUE and
//! libpcap bindings, and the final report.
#![warn(clippy::all, clippy::pedantic, rust_2018_idioms)]
#![allow(clippy::module_name_repetitions)]
#![forbid(unsafe_code)]

use anyhow::Context;
use clap::Parser;
use std::sync::mpsc;
use std::time::Duration;
use tracing::info;

use crate::args::{Args, LogFormat};
use crate::divert::NfqueueDivert;
use crate::sniff::PcapSniffer;
use flowtrace_core::{Builder, Observer};

mod args;
mod divert;
mod report;
mod sniff;

/// Run the flowtrace application.
pub fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    configure_logging(&args);
    let config = Builder::new()
        .ttl_max(args.max_ttl)
        .ttl_repeat_max(args.ttl_repeat)
        .mangle_freq(args.mangle_freq)
        .response_timeout(Duration::from_secs(args.response_timeout))
        .build()?;
    let divert = NfqueueDivert::open(args.queue)?;
    let sniffer = PcapSniffer::open(&args.iface)?;
    let mut observer = Observer::spawn(config, divert, sniffer)?;
    info!(
        iface = %args.iface,
        queue = args.queue,
        "riding diverted flows, ctrl-c to stop"
    );
    wait_for_interrupt()?;
    info!("shutting down");
    observer.stop();
    report::print(observer.registry());
    Ok(())
}

fn wait_for_interrupt() -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .context("failed to set interrupt handler")?;
    rx.recv().context("interrupt channel closed")?;
    Ok(())
}

fn configure_logging(args: &Args) {
    if !args.verbose {
        return;
    }
    match args.log_format {
        LogFormat::Compact => {
            tracing_subscriber::fmt()
                .with_env_filter(&args.log_filter)
                .compact()
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .with_env_filter(&args.log_filter)
                .pretty()
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(&args.log_filter)
                .json()
                .init();
        }
    }
}
