// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging and load the configuration
// 3. Start two helper tasks: one prints events, one listens for Ctrl-C
// 4. Run the harvester and print the summary
// 5. Exit with a code that tells scripts why the run stopped:
//    0 = all pages done, 1 = no next link, 2 = error,
//    3 = a page failed to load, 130 = cancelled
//
// Rust concepts used:
// - tokio::spawn: Run the event printer alongside the harvester
// - mpsc channels: The harvester sends events, the printer receives them
// - CancellationToken: A shared "please stop" flag
// =============================================================================

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use page_harvester::{
    CancellationToken, EventSink, HarvestEvent, Harvester, RunRequest, RunSummary,
    TerminationReason,
};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// The main application logic
// Returns the exit code of a finished run, or Err if it never started
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.load_config().context("could not load configuration")?;
    let harvester = Harvester::new(config)?;

    // Events are printed by their own task so the harvester never waits on
    // the terminal
    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(rx, cli.json));

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let request = RunRequest::new(cli.url.clone(), cli.pages, cli.output.clone());
    let result = harvester.run(request, &cancel, EventSink::new(tx)).await;
    ctrl_c.abort();

    // The run owned the only sender, so the printer stops once it has
    // drained what is left
    printer.await.context("event printer stopped unexpectedly")?;

    let summary = result?;
    print_summary(&summary, cli.json)?;

    Ok(summary.termination.exit_code())
}

// Logs go to stderr; RUST_LOG wins over the defaults chosen here
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "info,page_harvester=debug"
    } else {
        "info"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

// Prints every event until the harvester drops its sender
async fn print_events(mut rx: mpsc::UnboundedReceiver<HarvestEvent>, json: bool) {
    while let Some(event) = rx.recv().await {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => log::warn!("Could not serialize event: {}", e),
            }
        } else {
            log::log!(event.level(), "{}", event);
        }
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        log::warn!("Ctrl-C received, stopping after the current step");
        cancel.cancel();
    }
}

// Prints the final summary either as a banner or as JSON
fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!();
    println!("📊 Summary:");
    println!("   🖼️  Images downloaded: {}", summary.total_downloaded);
    println!("   📄 Pages processed: {}", summary.pages_processed);
    println!("   📁 Saved to: {}", summary.output_dir.display());
    println!(
        "   {} Stopped: {}",
        termination_icon(&summary.termination),
        summary.termination
    );
    Ok(())
}

fn termination_icon(reason: &TerminationReason) -> &'static str {
    match reason {
        TerminationReason::PageLimit => "✅",
        TerminationReason::NoNextLink => "🔚",
        TerminationReason::FetchFailed { .. } => "❌",
        TerminationReason::Cancelled { .. } => "⏹️ ",
    }
}
