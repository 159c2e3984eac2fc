//! Emberwood Remote CLI.
//!
//! Discovers Emberwood players on the local network and drives one of them
//! over its HTTP control surface, either as one-shot commands or as an
//! interactive session.

use std::collections::HashMap;
use std::process;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use emberwood_remote::config::Settings;
use emberwood_remote::control::ControlClient;
use emberwood_remote::discovery::discover_players;
use emberwood_remote::protocol::EpisodeRequest;
use emberwood_remote::registry::PlayerRecord;
use emberwood_remote::session::{render_status, SessionController};

const USAGE: &str = "emberwood-remote - discover and control Emberwood players

Usage: emberwood-remote [OPTIONS]

Options:
  -d, --discover           browse for players on the local network
  -u, --url <URL>          connect directly to a player base URL
  -t, --timeout <SECS>     discovery window in seconds
  -i, --interactive        enter the interactive session after connecting
      --list-all           print discovered players and exit
      --json               machine-readable discovery report
      --beam-url <URL>     play this URL on the player, then exit
  -h, --help               show this help

Without --url, a discovery window runs and the first player found is used.";

#[derive(Debug, Default)]
struct CliArgs {
    discover: bool,
    url: Option<String>,
    timeout_secs: Option<u64>,
    interactive: bool,
    list_all: bool,
    json: bool,
    beam_url: Option<String>,
    help: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut out = CliArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-d" | "--discover" => out.discover = true,
            "-u" | "--url" => out.url = Some(flag_value(&mut iter, arg)?),
            "-t" | "--timeout" => {
                let value = flag_value(&mut iter, arg)?;
                out.timeout_secs = Some(
                    value
                        .parse()
                        .map_err(|_| format!("{arg} expects a number of seconds"))?,
                );
            }
            "-i" | "--interactive" => out.interactive = true,
            "--list-all" => out.list_all = true,
            "--json" => out.json = true,
            "--beam-url" => out.beam_url = Some(flag_value(&mut iter, arg)?),
            "-h" | "--help" => out.help = true,
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(out)
}

fn flag_value<'a, I: Iterator<Item = &'a String>>(
    iter: &mut I,
    flag: &str,
) -> Result<String, String> {
    iter.next()
        .cloned()
        .ok_or_else(|| format!("{flag} expects a value"))
}

/// Machine-readable discovery report for `--json`.
#[derive(Debug, Serialize)]
struct DiscoveryReport {
    players_found: usize,
    players: Vec<ReportedPlayer>,
}

#[derive(Debug, Serialize)]
struct ReportedPlayer {
    name: String,
    address: String,
    host: String,
    port: u16,
    properties: HashMap<String, String>,
}

impl From<&PlayerRecord> for ReportedPlayer {
    fn from(record: &PlayerRecord) -> Self {
        Self {
            name: record.name.clone(),
            address: record.base_url(),
            host: record.host.clone(),
            port: record.port,
            properties: record.properties.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emberwood_remote=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("{message}\n\n{USAGE}");
            process::exit(2);
        }
    };
    if cli.help {
        println!("{USAGE}");
        return Ok(());
    }

    let settings = Settings::load()?;
    let mut target_url = cli.url.clone();

    if cli.discover || target_url.is_none() {
        let window =
            Duration::from_secs(cli.timeout_secs.unwrap_or(settings.discovery_timeout_secs));
        println!("Browsing for players for {}s...", window.as_secs());

        // Ctrl+C shortens the window; the daemon is still released.
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        let signal_watch = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                canceller.cancel();
            }
        });
        let players = discover_players(window, &cancel).await?;
        signal_watch.abort();

        let mut found: Vec<PlayerRecord> = players.into_values().collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));

        if cli.json {
            let report = DiscoveryReport {
                players_found: found.len(),
                players: found.iter().map(ReportedPlayer::from).collect(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        if found.is_empty() {
            println!("No players found on the network.");
            println!("Check that a player is running and that mDNS traffic is not blocked.");
            println!("Done.");
            return Ok(());
        }

        println!("Found {} player(s):", found.len());
        for (index, record) in found.iter().enumerate() {
            println!("{}. {}", index + 1, record.name);
            println!("   address: {}", record.base_url());
            println!("   host: {}:{}", record.host, record.port);
            println!(
                "   server: {}",
                record.property("server").unwrap_or("Unknown")
            );
            println!(
                "   version: {}",
                record.property("version").unwrap_or("Unknown")
            );
        }

        if cli.list_all {
            println!("Done.");
            return Ok(());
        }

        if target_url.is_none() {
            let first = &found[0];
            target_url = Some(first.base_url());
            println!("Using first discovered player: {}", first.base_url());
        }
    }

    if let Some(url) = target_url {
        println!("Connecting to player at {url}");
        let client =
            ControlClient::with_timeout(&url, Duration::from_secs(settings.request_timeout_secs))?;

        match client.info().await {
            Ok(player) => {
                println!("Connected to {} (version {})", player.name, player.version);
                if let Some(server) = &player.server_url {
                    println!("Upstream server: {server}");
                }

                match client.status().await {
                    Ok(status) => println!("{}", render_status(&status)),
                    Err(e) => println!("Failed to get status: {e}"),
                }

                if let Some(beam) = &cli.beam_url {
                    // Duration is deliberately absent: the player works it
                    // out from the stream.
                    let episode = EpisodeRequest {
                        episode_id: None,
                        episode_url: beam.clone(),
                        episode_title: "Beamed Audio".to_string(),
                        podcast_name: "Direct URL".to_string(),
                        episode_duration: None,
                        episode_artwork: None,
                        start_position: Some(0),
                    };
                    match client.play(&episode).await {
                        Ok(()) => println!("Beamed {beam}"),
                        Err(e) => println!("Failed to beam {beam}: {e}"),
                    }
                }

                if cli.interactive {
                    let reader = BufReader::new(tokio::io::stdin());
                    let mut session = SessionController::new(
                        client,
                        reader,
                        Duration::from_secs(settings.monitor_interval_secs),
                    );
                    session.run().await?;
                }
            }
            Err(e) => println!("Failed to connect to player: {e}"),
        }
    }

    println!("Done.");
    Ok(())
}
