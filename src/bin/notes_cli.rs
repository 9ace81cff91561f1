//! ai-notes-cli: drive the resilient note client from the shell.
//!
//! Usage:
//!   ai-notes-cli get <id>                   Fetch one note
//!   ai-notes-cli search <query> [--hits N]  Search notes
//!   ai-notes-cli folders                    List folders
//!   ai-notes-cli create <title> <content>   Create a note
//!   ai-notes-cli rename <id> <title>        Retitle a note, keeping its body
//!   ai-notes-cli append <id> <text>         Append to a note's body
//!   ai-notes-cli delete <id>                Delete a note
//!   ai-notes-cli stats                      List folders twice, then show signals

use ai_notes_rust::{AccessConfig, CallOptions, NoteDraft, ResilientClient};
use anyhow::{bail, Context};
use serde::Serialize;
use serde_json::json;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    match args[1].as_str() {
        "version" | "--version" | "-V" => {
            println!("ai-notes-cli {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        "help" | "--help" | "-h" => {
            print_usage();
            return;
        }
        _ => {}
    }

    if let Err(err) = run(&args[1], &args[2..]).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"ai-notes-cli - resilient note service client

USAGE:
    ai-notes-cli <COMMAND> [ARGS]

COMMANDS:
    get <id>                    Fetch one note
    search <query> [--hits N]   Search notes (default 10 hits)
    folders                     List folders
    create <title> <content>    Create a note
    rename <id> <title>         Retitle a note, keeping its body
    append <id> <text>          Append to a note's body
    delete <id>                 Delete a note
    stats                       List folders twice, then show call stats
                                and rate limiter and cache signals
    version                     Show version information
    help                        Show this help message

ENVIRONMENT:
    SLITE_API_KEY               Note service API key
    NOTES_BASE_URL              Note service base URL
    LOG_LEVEL                   Log level (default INFO; RUST_LOG wins)"#
    );
}

async fn run(command: &str, args: &[String]) -> anyhow::Result<()> {
    let config = AccessConfig::from_env().context("loading configuration")?;
    ai_notes_rust::logging::init(&config.log_level);
    if config.notes_api_key.is_none() {
        eprintln!("warning: SLITE_API_KEY is not set; requests will likely be rejected");
    }
    let client = ResilientClient::for_notes(&config).context("building client")?;

    match command {
        "get" => {
            let id = arg(args, 0, "note id")?;
            print_json(&client.get_note(id).await?)
        }
        "search" => {
            let query = arg(args, 0, "query")?;
            let hits = flag_value(args, "--hits")
                .map(|v| v.parse::<u32>().context("--hits expects a number"))
                .transpose()?;
            print_json(&client.search_notes(query, hits).await?)
        }
        "folders" => print_json(&client.list_folders().await?),
        "create" => {
            let title = arg(args, 0, "title")?;
            let content = arg(args, 1, "content")?;
            print_json(&client.create_note(&NoteDraft::new(title, content)).await?)
        }
        "rename" => {
            let id = arg(args, 0, "note id")?;
            let title = arg(args, 1, "title")?;
            print_json(&client.rename_note(id, title).await?)
        }
        "append" => {
            let id = arg(args, 0, "note id")?;
            let text = arg(args, 1, "text")?;
            print_json(&client.append_to_note(id, text).await?)
        }
        "delete" => {
            let id = arg(args, 0, "note id")?;
            client.delete_note(id).await?;
            println!("deleted {id}");
            Ok(())
        }
        "stats" => {
            // The second listing should come from the cache.
            for round in 1..=2 {
                let (_, stats) = client
                    .run_resilient_with_stats("list_folders", json!({}), CallOptions::new())
                    .await?;
                println!(
                    "list_folders #{round}: attempts {}, cache hit {}, limiter wait {} ms, took {} ms",
                    stats.attempts, stats.cache_hit, stats.limiter_wait_ms, stats.duration_ms
                );
            }
            let signals = client.signals().await;
            println!(
                "rate limiter: {}/{} in window, estimated wait {:?} ms",
                signals.rate_limiter.in_window,
                signals.rate_limiter.max_requests,
                signals.rate_limiter.estimated_wait_ms
            );
            println!(
                "notes cache: {} entries, hit ratio {:.2}",
                signals.notes_cache.entries,
                signals.notes_cache.stats.hit_ratio()
            );
            println!(
                "folders cache: {}/{} entries, {} hits, {} misses",
                signals.folders_cache.entries,
                signals.folders_cache.capacity,
                signals.folders_cache.stats.hits,
                signals.folders_cache.stats.misses
            );
            Ok(())
        }
        other => {
            print_usage();
            bail!("unknown command: {other}")
        }
    }
}

fn arg<'a>(args: &'a [String], index: usize, what: &str) -> anyhow::Result<&'a str> {
    match args.get(index) {
        Some(v) if !v.starts_with("--") => Ok(v.as_str()),
        _ => bail!("missing {what}"),
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
