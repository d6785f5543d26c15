//! pyngd: receives files smuggled in ICMP echo payloads.

use std::io::ErrorKind;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use pyng_core::config::PyngConfig;
use pyng_core::digest::DigestAlgorithm;
use pyng_services::{ReceiverStateMachine, TransferFinalizer};

mod capture;
mod listener;

use capture::IcmpCapture;

fn print_usage() {
    println!("Usage: pyngd [options] [BIND_IP]");
    println!();
    println!("Listens for ICMP echo requests and rebuilds files sent with pyng-send.");
    println!("BIND_IP defaults to the configured receiver.bind_addr (0.0.0.0).");
    println!();
    println!("Options:");
    println!("  --out <dir>        Directory for reassembled files");
    println!("  --digest <alg>     Fingerprint: md5 | blake3");
    println!("  -h, --help         Show this help");
}

/// Apply command-line arguments over the loaded config.
/// Returns false when only help was requested.
fn apply_args(config: &mut PyngConfig, args: &[String]) -> Result<bool> {
    let mut positional: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(false);
            }
            "--out" => {
                i += 1;
                config.receiver.output_dir =
                    PathBuf::from(args.get(i).context("--out requires a value")?);
            }
            "--digest" => {
                i += 1;
                let alg = args.get(i).context("--digest requires a value")?;
                config.receiver.digest = alg
                    .parse::<DigestAlgorithm>()
                    .map_err(anyhow::Error::msg)?;
            }
            other => positional.push(other),
        }
        i += 1;
    }

    match positional.as_slice() {
        [] => {}
        [host] => {
            config.receiver.bind_addr = host
                .parse::<Ipv4Addr>()
                .with_context(|| format!("invalid IPv4 address: {host}"))?;
        }
        other => {
            print_usage();
            bail!("unexpected arguments: {}", other.join(" "));
        }
    }
    Ok(true)
}

fn open_capture(addr: Ipv4Addr) -> Result<IcmpCapture> {
    match IcmpCapture::bind(addr) {
        Ok(capture) => Ok(capture),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            bail!("pyngd requires root level permissions (or CAP_NET_RAW)")
        }
        Err(e) => Err(e).with_context(|| format!("failed to bind on {addr}")),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = PyngConfig::load().context("failed to load config")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !apply_args(&mut config, &args)? {
        return Ok(());
    }

    let mut capture = open_capture(config.receiver.bind_addr)?;
    let finalizer = TransferFinalizer::new(
        config.receiver.output_dir.clone(),
        config.receiver.digest,
    );
    let mut machine = ReceiverStateMachine::new();

    tracing::info!(
        addr = %capture.bound_addr(),
        output = %finalizer.output_dir().display(),
        digest = config.receiver.digest.name(),
        "pyng receiver listening"
    );

    tokio::select! {
        r = tokio::signal::ctrl_c() => {
            r.context("failed to listen for shutdown signal")?;
            tracing::info!("shutdown signal received");
        }
        r = listener::run(&mut capture, &mut machine, &finalizer) => r?,
    }

    if let Some(buffer) = machine.buffer() {
        tracing::info!(
            transfer = machine.transfer_number(),
            chunks = buffer.len(),
            "dropping incomplete transfer on shutdown"
        );
    }

    Ok(())
}
