//! pyng-send: sends a file to a pyngd receiver inside ICMP echo requests.

use std::io::{ErrorKind, Write};
use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use pyng_core::config::{PyngConfig, SendBackend};
use pyng_services::{EchoSender, Progress, Transmitter};

mod echo;

use echo::{PingCommand, RawEcho};

fn print_usage() {
    println!("Usage: pyng-send [options] <SRV_IP> <FILE_PATH>");
    println!();
    println!("Options:");
    println!("  --backend <ping|raw>   How echo requests are emitted (default: ping)");
    println!("  --interval <ms>        Pause between chunks");
    println!("  -h, --help             Show this help");
}

struct Request {
    host: Ipv4Addr,
    path: String,
}

/// Parse arguments, applying options over `config`.
/// Returns None when only help was requested.
fn parse_args(config: &mut PyngConfig, args: &[String]) -> Result<Option<Request>> {
    let mut positional: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(None);
            }
            "--backend" => {
                i += 1;
                let backend = args.get(i).context("--backend requires a value")?;
                config.sender.backend = backend
                    .parse::<SendBackend>()
                    .map_err(anyhow::Error::msg)?;
            }
            "--interval" => {
                i += 1;
                config.sender.interval_ms = args
                    .get(i)
                    .context("--interval requires a value")?
                    .parse()
                    .context("--interval must be a number of milliseconds")?;
            }
            other => positional.push(other),
        }
        i += 1;
    }

    match positional.as_slice() {
        [host, path] => {
            let host = host
                .parse::<Ipv4Addr>()
                .with_context(|| format!("invalid IPv4 address: {host}"))?;
            Ok(Some(Request {
                host,
                path: path.to_string(),
            }))
        }
        _ => {
            print_usage();
            bail!("expected <SRV_IP> <FILE_PATH>");
        }
    }
}

fn report_progress(p: Progress) {
    print!("\r[+]  Sent: {} / {}", p.sent, p.total);
    if p.is_done() {
        println!();
    }
    let _ = std::io::stdout().flush();
}

async fn send_file<S: EchoSender>(
    sender: S,
    interval: Duration,
    request: &Request,
    content: &[u8],
) -> Result<()> {
    let mut tx = Transmitter::new(sender).with_interval(interval);
    let summary = tx
        .transmit_file(request.host, &request.path, content, report_progress)
        .await
        .context("transfer aborted")?;
    tracing::info!(
        host = %request.host,
        chunks = summary.chunks,
        bytes = summary.bytes,
        "transfer sent"
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut config = PyngConfig::load().context("failed to load config")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(request) = parse_args(&mut config, &args)? else {
        return Ok(());
    };

    let content = tokio::fs::read(&request.path)
        .await
        .with_context(|| format!("file read error: {}", request.path))?;

    println!("[+]  Transfer start");
    println!("[+]  File: {}", request.path);
    println!("[+]  Size: {} bytes", content.len());

    let interval = Duration::from_millis(config.sender.interval_ms);
    match config.sender.backend {
        SendBackend::Ping => {
            let ping = PingCommand::new(config.sender.ping_program.clone());
            send_file(ping, interval, &request, &content).await
        }
        SendBackend::Raw => {
            let raw = match RawEcho::open() {
                Ok(raw) => raw,
                Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                    bail!("raw backend requires root level permissions (or CAP_NET_RAW)")
                }
                Err(e) => return Err(e).context("failed to open raw ICMP socket"),
            };
            send_file(raw, interval, &request, &content).await
        }
    }
}
