//! `triage`: interactive health-chat client.
//!
//! ```bash
//! # Ask interactively, /quit to leave
//! triage --url https://example.supabase.co/functions/v1/health-chat
//!
//! # Start with symptoms, print the conversation as JSON and exit
//! triage --symptoms "I have a headache" --once --json
//!
//! # Verbose logging
//! RUST_LOG=triage_chat=debug,triage_stream=debug triage
//! ```
//!
//! Ctrl-C cancels a reply that is still streaming; at the prompt it exits.

mod render;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use triage_chat::{ChatSession, ExchangeOutcome, HttpTransport};
use triage_core::config::TriageConfig;

use render::{ReplyPrinter, DISCLAIMER};

const QUIT: &str = "/quit";

/// Streaming health-chat client
#[derive(Parser, Debug)]
#[command(name = "triage")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "TRIAGE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Health-chat endpoint URL (overrides config)
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Bearer key for the endpoint (overrides config)
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// Symptoms to submit as the first message
    #[arg(short = 's', long, value_name = "TEXT")]
    symptoms: Option<String>,

    /// Exit after the first exchange instead of reading stdin
    #[arg(long, requires = "symptoms")]
    once: bool,

    /// Print the final status and conversation as JSON on exit
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "triage=info,triage_chat=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let transport = HttpTransport::from_config(&config.endpoint);
    let session = ChatSession::new(Box::new(transport))
        .with_max_pending_bytes(config.stream.max_pending_bytes);
    info!(url = %config.endpoint.url, "health-chat client ready");

    if config.ui.show_disclaimer && session.snapshot().is_empty() {
        eprintln!("{DISCLAIMER}\n");
    }

    let mut failed = false;
    if let Some(symptoms) = args.symptoms.as_deref() {
        println!("> {symptoms}");
        failed = matches!(exchange(&session, symptoms).await?, ExchangeOutcome::Failed(_));
    }

    if !args.once {
        repl(&session).await?;
    }

    if args.json {
        let report = serde_json::json!({
            "status": session.status(),
            "messages": session.snapshot().messages(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if args.once && failed {
        anyhow::bail!("exchange failed: {}", session.status());
    }
    Ok(())
}

/// File/env config with command-line overrides applied on top.
fn load_config(args: &Args) -> Result<TriageConfig> {
    let path = args.config.as_deref().and_then(Path::to_str);
    let mut config = TriageConfig::load(path).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        TriageConfig::default()
    });

    if let Some(url) = &args.url {
        config.endpoint.url = url.clone();
    }
    if let Some(key) = &args.api_key {
        config.endpoint.api_key = Some(key.clone());
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Read lines from stdin and submit each one until `/quit` or end of input.
async fn repl(session: &ChatSession) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("reading stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == QUIT {
            break;
        }
        exchange(session, text).await?;
    }
    Ok(())
}

/// Run one exchange, echoing the reply as it streams in.
async fn exchange(session: &ChatSession, text: &str) -> Result<ExchangeOutcome> {
    let mut log = session.observe_log();
    let mut status = session.observe_status();
    // the reply lands after the user message this exchange appends
    let mut printer = ReplyPrinter::new(io::stdout(), session.snapshot().len() + 1);

    let submit = session.submit(text);
    tokio::pin!(submit);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut analyzing_shown = false;
    let mut cancelled = false;

    let outcome = loop {
        tokio::select! {
            outcome = &mut submit => break outcome,
            Ok(()) = log.changed() => {
                let snapshot = log.borrow_and_update().clone();
                printer.render(&snapshot)?;
            }
            Ok(()) = status.changed() => {
                status.borrow_and_update();
                if !analyzing_shown && session.awaiting_reply() {
                    eprintln!("Analyzing...");
                    analyzing_shown = true;
                }
            }
            _ = &mut ctrl_c, if !cancelled => {
                session.cancel();
                cancelled = true;
            }
        }
    };

    match outcome {
        ExchangeOutcome::Finalized { incomplete } => {
            printer.render(&session.snapshot())?;
            printer.finish()?;
            if incomplete {
                eprintln!("(the reply was cut off before it finished)");
            }
        }
        ExchangeOutcome::Failed(reason) => {
            printer.finish()?;
            eprintln!("{reason}");
        }
        ExchangeOutcome::Rejected => {}
    }
    Ok(outcome)
}
