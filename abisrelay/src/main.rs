//! main - runs either the BTS-side Abis/IP proxy or the BSC-NAT

use abisrelay::{NatConfig, NatHandle, ProxyConfig, ProxyHandle};
use abisrelay::{BSC_PORT, OML_PORT, RSL_PORT, UDP_BSC_BASE, UDP_BTS_BASE};
use anyhow::{Result, ensure};
use async_std::channel::Sender;
use async_std::prelude::*;
use clap::{Parser, Subcommand};
use ipa::net::LinkLimits;
use signal_hook::consts::signal::*;
use signal_hook_async_std::Signals;
use slog::{Drain, Logger, info, o};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Local IP address that listeners and UDP injection sockets bind to.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    local_ip: IpAddr,

    /// Seconds of silence on a TCP connection before it is sent a PING.
    #[arg(long, default_value_t = 20)]
    ping_interval: u64,

    /// Seconds to wait for any traffic after a PING before closing the connection.
    #[arg(long, default_value_t = 5)]
    pong_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Correlate the OML and RSL connections of each BTS and expose them on UDP.
    Proxy {
        #[arg(long, default_value_t = OML_PORT)]
        oml_port: u16,

        #[arg(long, default_value_t = RSL_PORT)]
        rsl_port: u16,

        /// Injection sockets toward the BTS bind to this base + site%1000 + bts%100.
        #[arg(long, default_value_t = UDP_BTS_BASE)]
        udp_bts_base: u16,

        /// Injection sockets toward the BSC bind to this base + site%1000 + bts%100.
        #[arg(long, default_value_t = UDP_BSC_BASE)]
        udp_bsc_base: u16,
    },

    /// Multiplex many BSCs onto a single MSC connection.
    Nat {
        /// Address of the MSC, for example 10.0.0.1:5000.
        #[arg(long)]
        msc: SocketAddr,

        #[arg(long, default_value_t = BSC_PORT)]
        bsc_port: u16,

        /// TOML file of accepted BSC tokens and their LACs.
        #[arg(long, default_value = "bscs.toml")]
        bscs_file: String,

        /// Unit name given to the MSC when it asks for the NAT's identity.
        #[arg(long, default_value = "abisrelay")]
        token: String,

        /// Seconds a BSC has to authenticate before it is disconnected.
        #[arg(long, default_value_t = 2)]
        auth_timeout: u64,

        /// Seconds between attempts to reconnect to the MSC.
        #[arg(long, default_value_t = 5)]
        msc_reconnect_interval: u64,

        /// Seconds an MSC connection attempt may take before it counts as failed.
        #[arg(long, default_value_t = 5)]
        msc_connect_timeout: u64,
    },
}

#[async_std::main]
async fn main() -> Result<()> {
    exit_on_panic();
    let logger = init_logging();

    let args = Args::parse();
    ensure!(args.ping_interval > 0, "Ping interval must be at least 1s");
    ensure!(args.pong_timeout > 0, "Pong timeout must be at least 1s");
    let limits = LinkLimits {
        ping_interval: Duration::from_secs(args.ping_interval),
        pong_timeout: Duration::from_secs(args.pong_timeout),
        ..LinkLimits::default()
    };

    match args.command {
        Command::Proxy {
            oml_port,
            rsl_port,
            udp_bts_base,
            udp_bsc_base,
        } => {
            check_udp_bases(udp_bts_base, udp_bsc_base)?;
            let proxy = ProxyHandle::start(
                ProxyConfig {
                    ip_addr: args.local_ip,
                    oml_port,
                    rsl_port,
                    udp_bts_base,
                    udp_bsc_base,
                    limits,
                },
                logger.new(o!("proxy" => 1)),
            )
            .await?;
            wait_for_signal().await?;
            proxy.graceful_shutdown().await;
        }
        Command::Nat {
            msc,
            bsc_port,
            bscs_file,
            token,
            auth_timeout,
            msc_reconnect_interval,
            msc_connect_timeout,
        } => {
            ensure!(auth_timeout > 0, "Authentication timeout must be at least 1s");
            ensure!(msc_connect_timeout > 0, "MSC connect timeout must be at least 1s");
            ensure!(token.len() <= 255, "Token is longer than 255 bytes");
            let bscs = abisrelay::bscs::load_bscs_file(&bscs_file, &logger)?;
            info!(&logger, "Loaded {} BSC tokens", bscs.len());
            let nat = NatHandle::start(
                NatConfig {
                    ip_addr: args.local_ip,
                    bsc_port,
                    msc_addr: msc,
                    msc_token: token,
                    auth_timeout: Duration::from_secs(auth_timeout),
                    msc_reconnect_interval: Duration::from_secs(msc_reconnect_interval),
                    msc_connect_timeout: Duration::from_secs(msc_connect_timeout),
                    limits,
                },
                bscs,
                logger.new(o!("nat" => 1)),
            )
            .await?;
            wait_for_signal().await?;
            nat.graceful_shutdown().await;
        }
    }

    Ok(())
}

fn init_logging() -> Logger {
    // Use info level logging by default
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info") }
    }
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = slog_envlogger::new(drain);
    slog::Logger::root(drain, o!())
}

fn exit_on_panic() {
    let orig_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        orig_hook(panic_info);
        std::process::exit(1);
    }));
}

// Every site/bts maps to an offset of at most 999 + 99.
fn check_udp_bases(bts_base: u16, bsc_base: u16) -> Result<()> {
    const SPAN: u16 = 999 + 99 + 1;
    ensure!(
        bts_base.checked_add(SPAN).is_some() && bsc_base.checked_add(SPAN).is_some(),
        "UDP base ports must leave room for {SPAN} ports"
    );
    ensure!(
        bts_base.abs_diff(bsc_base) >= SPAN,
        "UDP base ports must be at least {SPAN} apart"
    );
    Ok(())
}

async fn wait_for_signal() -> Result<i32> {
    let signals = Signals::new([SIGHUP, SIGTERM, SIGINT, SIGQUIT])?;
    let handle = signals.handle();
    let (sig_sender, sig_receiver) = async_std::channel::unbounded();
    let signals_task = async_std::task::spawn(handle_signals(signals, sig_sender));
    let signal = sig_receiver.recv().await;
    handle.close();
    signals_task.await;
    Ok(signal?)
}

async fn handle_signals(signals: Signals, sig_sender: Sender<i32>) {
    let mut signals = signals.fuse();
    while let Some(signal) = signals.next().await {
        match signal {
            // Nothing to reload.
            SIGHUP => {}
            SIGTERM | SIGINT | SIGQUIT => {
                let _ = sig_sender.send(signal).await;
            }
            _ => unreachable!(),
        }
    }
}
