//! Rendezvous CLI
//!
//! STUN Binding responder and WebRTC signaling relay

mod config;

use clap::{Parser, Subcommand};
use rendezvous_signaling::SignalingServer;
use rendezvous_stun::{DEFAULT_STUN_PORT, StunClient, StunServer};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

use config::Config;

/// Rendezvous - STUN and signaling for WebRTC peers
#[derive(Parser)]
#[command(name = "rendezvous")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the STUN responder and the signaling relay
    Serve {
        /// STUN UDP listen address
        #[arg(long)]
        stun_bind: Option<String>,

        /// Signaling WebSocket listen address
        #[arg(long)]
        signal_bind: Option<String>,

        /// Do not run the STUN responder
        #[arg(long)]
        no_stun: bool,

        /// Do not run the signaling relay
        #[arg(long)]
        no_signaling: bool,
    },

    /// Run only the STUN responder
    Stun {
        /// UDP listen address
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Run only the signaling relay
    Signal {
        /// WebSocket listen address
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Ask a STUN server for this host's reflected address
    Probe {
        /// STUN server (host or host:port)
        #[arg(required = true)]
        server: String,

        /// Response timeout in milliseconds
        #[arg(long, default_value_t = 3000)]
        timeout_ms: u64,
    },

    /// Show the effective configuration
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let (mut config, config_path) = match &cli.config {
        Some(path) => (Config::load(path)?, path.clone()),
        None => (Config::load_or_default()?, Config::default_path()),
    };

    // Initialize logging; RUST_LOG takes precedence
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.to_lowercase()
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    match cli.command {
        Commands::Serve {
            stun_bind,
            signal_bind,
            no_stun,
            no_signaling,
        } => {
            if let Some(addr) = stun_bind {
                config.stun.listen_addr = addr;
            }
            if let Some(addr) = signal_bind {
                config.signaling.listen_addr = addr;
            }
            if no_stun {
                config.stun.enabled = false;
            }
            if no_signaling {
                config.signaling.enabled = false;
            }
            config.validate()?;
            serve(&config).await?;
        }
        Commands::Stun { bind } => {
            if let Some(addr) = bind {
                config.stun.listen_addr = addr;
            }
            config.stun.enabled = true;
            config.signaling.enabled = false;
            config.validate()?;
            serve(&config).await?;
        }
        Commands::Signal { bind } => {
            if let Some(addr) = bind {
                config.signaling.listen_addr = addr;
            }
            config.stun.enabled = false;
            config.signaling.enabled = true;
            config.validate()?;
            serve(&config).await?;
        }
        Commands::Probe { server, timeout_ms } => {
            probe(&server, Duration::from_millis(timeout_ms)).await?;
        }
        Commands::Status => {
            show_status(&config, &config_path)?;
        }
    }

    Ok(())
}

/// Run the enabled services until Ctrl-C or until one of them fails
async fn serve(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        "Starting Rendezvous (stun: {}, signaling: {})",
        config.stun.enabled,
        config.signaling.enabled
    );

    let mut services = JoinSet::new();

    if config.stun.enabled {
        let server = StunServer::bind(config.stun_addr()?).await?;
        println!("STUN responder listening on udp://{}", server.local_addr()?);
        services.spawn(async move { server.run().await.map_err(anyhow::Error::from) });
    }

    if config.signaling.enabled {
        let server =
            SignalingServer::bind(config.signaling_addr()?, config.signaling_server_config())
                .await?;
        println!("Signaling relay listening on ws://{}", server.local_addr()?);
        services.spawn(async move { server.run().await.map_err(anyhow::Error::from) });
    }

    println!("Press Ctrl+C to stop");

    tokio::select! {
        finished = services.join_next() => {
            if let Some(result) = finished {
                if let Err(e) = result? {
                    tracing::error!("Service stopped: {}", e);
                    return Err(e);
                }
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            println!("\nShutting down...");
            tracing::info!("Shutdown requested");
        }
    }

    services.shutdown().await;
    Ok(())
}

/// Send one Binding Request and print the reflected address
async fn probe(server: &str, timeout: Duration) -> anyhow::Result<()> {
    let server_addr = resolve_server(server).await?;
    tracing::info!("Probing STUN server {} (resolved {})", server, server_addr);

    let bind_addr = match server_addr.ip() {
        IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    };

    let mut client = StunClient::bind(bind_addr).await?;
    client.set_timeout(timeout);

    println!("Querying STUN server {}...", server_addr);
    let mapped = client.get_mapped_address(server_addr).await?;

    println!("Local address:     {}", client.local_addr()?);
    println!("Reflected address: {}", mapped);

    Ok(())
}

/// Resolve `host`, `host:port`, `ip` or `ip:port`, defaulting to the STUN port
async fn resolve_server(server: &str) -> anyhow::Result<SocketAddr> {
    if let Ok(addr) = server.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = server.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_STUN_PORT));
    }

    let target = if server.contains(':') {
        server.to_string()
    } else {
        format!("{server}:{DEFAULT_STUN_PORT}")
    };

    tokio::net::lookup_host(&target)
        .await?
        .next()
        .ok_or_else(|| anyhow::anyhow!("No addresses found for '{}'", server))
}

/// Print the effective configuration
fn show_status(config: &Config, path: &std::path::Path) -> anyhow::Result<()> {
    println!("Rendezvous Status");
    println!("  Config file: {}", path.display());
    println!();

    let state = |enabled: bool| if enabled { "enabled" } else { "disabled" };

    println!("STUN responder:  {}", state(config.stun.enabled));
    println!("  Listen:        udp://{}", config.stun.listen_addr);
    println!();
    println!("Signaling relay: {}", state(config.signaling.enabled));
    println!("  Listen:        ws://{}", config.signaling.listen_addr);
    println!("  Peers reply:   {}", config.signaling.announce_peers);
    println!("  Queue size:    {}", config.signaling.channel_capacity);
    println!();
    println!("Log level:       {}", config.logging.level);

    if let Err(e) = config.validate() {
        println!();
        println!("Configuration problem: {}", e);
    }

    Ok(())
}
