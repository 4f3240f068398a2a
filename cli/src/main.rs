// dualroute — CLI for the static multi-protocol routing layer
//
// Validates routing configurations, inspects per-node tables and lane decisions,
// and traces packets through an in-memory loopback network.

mod config;
mod network;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dualroute_core::{Disposition, NodeId, Packet, Protocol, RoutingModel, Selection};
use network::{LoopbackNetwork, TraceEvent};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dualroute")]
#[command(about = "Static routing for dual-protocol (Wifi/Zigbee) nodes", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the per-user config)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log routing decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the route source and bring up every configured node
    Check,
    /// Print a node's route table
    Routes { node: NodeId },
    /// Show the lane a node picks for a destination
    Select { node: NodeId, destination: NodeId },
    /// Trace one packet through a loopback network of all nodes
    Send {
        source: NodeId,
        destination: NodeId,
        /// Payload bytes after the reserved headers
        #[arg(short, long, default_value = "64")]
        payload: usize,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default configuration
    Init {
        #[arg(short, long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "dualroute_core=debug,dualroute=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let config_path = config::Config::resolve_path(cli.config.as_deref())?;

    match cli.command {
        Commands::Check => cmd_check(&config_path),
        Commands::Routes { node } => cmd_routes(&config_path, node),
        Commands::Select { node, destination } => cmd_select(&config_path, node, destination),
        Commands::Send {
            source,
            destination,
            payload,
        } => cmd_send(&config_path, source, destination, payload),
        Commands::Config { action } => cmd_config(&config_path, action),
    }
}

fn load(config_path: &Path) -> Result<(config::Config, RoutingModel)> {
    let config = config::Config::load(config_path)?;
    let model = RoutingModel::from_config(&config.model, config::Config::base_dir(config_path))
        .context("Failed to load routing model")?;
    Ok((config, model))
}

fn cmd_check(config_path: &Path) -> Result<()> {
    println!("{}", "Checking routing configuration...".bold());
    println!();

    let (config, model) = load(config_path)?;
    println!("  {} Configuration: {}", "✓".green(), config_path.display());
    println!(
        "  {} Route source: {} route(s)",
        "✓".green(),
        model.source().entries().len()
    );

    let net = LoopbackNetwork::build(&model, &config, &[])?;
    for engine in net.nodes() {
        println!(
            "  {} Node {:<6} {:<12} {} route(s)",
            "✓".green(),
            engine.node_id(),
            engine.capability().to_string(),
            engine.routes().len()
        );
    }

    println!();
    println!("{}", "Configuration OK".green().bold());
    Ok(())
}

fn cmd_routes(config_path: &Path, node: NodeId) -> Result<()> {
    let (_, model) = load(config_path)?;
    let table = model
        .source()
        .table_for(node)
        .with_context(|| format!("Invalid routes for node {}", node))?;

    if table.is_empty() {
        println!("{}", format!("No routes for node {}.", node).dimmed());
        return Ok(());
    }

    println!("{} ({} total)", format!("Routes of node {}", node).bold(), table.len());
    println!();
    println!(
        "  {:<12} {:<10} {}",
        "DESTINATION".dimmed(),
        "NEXT HOP".dimmed(),
        "PROTOCOL".dimmed()
    );
    for route in table.routes() {
        println!(
            "  {:<12} {:<10} {}",
            route.destination.to_string().bright_cyan(),
            route.next_hop,
            route.next_hop_protocol
        );
    }
    Ok(())
}

fn cmd_select(config_path: &Path, node: NodeId, destination: NodeId) -> Result<()> {
    let (config, model) = load(config_path)?;
    let mut net = LoopbackNetwork::build(&model, &config, &[node])?;
    let engine = net.node_mut(node).context("Node missing from loopback network")?;

    let route = *engine
        .routes()
        .lookup(destination)
        .with_context(|| format!("Node {} has no route to {}", node, destination))?;

    println!("{}", format!("Node {} → {}", node, destination).bold());
    println!("  Capability: {}", engine.capability());
    println!("  Tie-break:  {:?}", engine.tie_break());
    println!(
        "  Next hop:   {} via {}",
        route.next_hop.to_string().bright_cyan(),
        route.next_hop_protocol
    );

    match engine.select_for(destination)? {
        Selection::Lane { protocol, index } => {
            engine.set_pending_destination(destination);
            let reserved = engine.header_size()?;
            println!("  Lane:       {} ({})", index, protocol.to_string().bright_green());
            if let Some(pending) = engine.pending_destination() {
                println!("  Header:     {} bytes reserved for {}", reserved, pending);
            }
        }
        Selection::Incompatible => {
            println!(
                "  Lane:       {}",
                format!("none, node cannot speak {}", route.next_hop_protocol).bright_red()
            );
        }
    }
    Ok(())
}

fn cmd_send(config_path: &Path, source: NodeId, destination: NodeId, payload: usize) -> Result<()> {
    let (config, model) = load(config_path)?;
    let mut net = LoopbackNetwork::build(&model, &config, &[source, destination])?;

    let engine = net.node_mut(source).context("Source node missing from loopback network")?;
    engine.set_pending_destination(destination);
    let reserved = engine
        .header_size()
        .with_context(|| format!("Node {} cannot size a packet for {}", source, destination))?;

    let mut packet = Packet::new(reserved + payload, Protocol::Wifi);
    for (i, byte) in packet.data_mut()[reserved..].iter_mut().enumerate() {
        *byte = i as u8;
    }
    engine
        .send(packet, destination)
        .with_context(|| format!("Node {} cannot send to {}", source, destination))?;

    println!(
        "{}",
        format!("Sending {} bytes {} → {}", reserved + payload, source, destination).bold()
    );
    println!();

    for event in net.run() {
        print_event(&event);
    }

    println!();
    let delivered: Vec<_> = net
        .deliveries()
        .into_iter()
        .filter(|d| d.node == destination)
        .collect();
    if delivered.is_empty() {
        println!("{}", "Packet did not reach its destination".bright_red().bold());
    } else {
        println!(
            "{} Delivered {} time(s) to node {} ({} bytes)",
            "✓".green(),
            delivered.len(),
            destination,
            delivered[0].size
        );
    }

    println!();
    println!("{}", "Node counters".bold());
    for engine in net.nodes() {
        let stats = engine.stats();
        if stats == Default::default() {
            continue;
        }
        println!(
            "  Node {:<6} originated {} forwarded {} translated {} (+{} copies) \
             delivered {} dropped {}",
            engine.node_id(),
            stats.originated,
            stats.forwarded,
            stats.translated,
            stats.fragment_copies,
            stats.delivered,
            stats.dropped
        );
    }
    Ok(())
}

fn print_event(event: &TraceEvent) {
    match event {
        TraceEvent::Hop {
            from,
            to,
            protocol,
            size,
            disposition,
        } => {
            let outcome = match disposition {
                Disposition::Delivered { consumers } => {
                    format!("delivered to {} consumer(s)", consumers).green()
                }
                Disposition::Forwarded { next_hop, lane } => {
                    format!("forwarded to {} on lane {}", next_hop, lane).normal()
                }
                Disposition::Translated {
                    next_hop,
                    from,
                    to,
                    size,
                    transmissions,
                } => format!(
                    "translated {} → {} for {}: {} bytes x{}",
                    from, to, next_hop, size, transmissions
                )
                .bright_yellow(),
                Disposition::Dropped { reason } => format!("dropped ({:?})", reason).bright_red(),
            };
            println!("  {} → {} [{}, {} bytes] {}", from, to, protocol, size, outcome);
        }
        TraceEvent::Lost { from, to, protocol } => {
            println!(
                "  {} → {} [{}] {}",
                from,
                to,
                protocol,
                "lost: next hop cannot hear this protocol".bright_red()
            );
        }
        TraceEvent::Truncated { pending } => {
            println!(
                "  {}",
                format!("hop limit reached, {} frame(s) still in flight", pending).bright_red()
            );
        }
    }
}

fn cmd_config(config_path: &Path, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at {} (use --force to overwrite)",
                    config_path.display()
                );
            }
            config::Config::default().save(config_path)?;
            println!("{} Wrote {}", "✓".green(), config_path.display().to_string().bright_cyan());
        }

        ConfigAction::Show => {
            let config = config::Config::load(config_path)?;
            println!("{}", "Configuration".bold());
            println!("  {}", config_path.display().to_string().dimmed());
            println!();

            for (key, value) in config.list() {
                println!("  {:<20} {}", key.bright_cyan(), value);
            }
        }
    }

    Ok(())
}
