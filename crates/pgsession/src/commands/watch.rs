//! Watch command - keeps the background pruner running until Ctrl-C.

use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, style};
use postgrest_session::{PostgrestSessionStore, StoreEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use super::Context;

/// Arguments for the watch command.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Override the prune interval in seconds
    #[arg(long)]
    pub interval: Option<u64>,
}

/// Run the watch command.
pub async fn run(args: WatchArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.config.clone();
    if let Some(secs) = args.interval {
        if secs == 0 {
            bail!("--interval must be greater than zero");
        }
        config = config.with_prune_interval(Duration::from_secs(secs));
    }
    let Some(period) = config.prune_session_interval.period() else {
        bail!("pruning is disabled in the configuration");
    };

    let (store, mut events) = PostgrestSessionStore::new_subscribed(config)?;

    if !ctx.json_output {
        let dim = Style::new().dim();
        println!("{}", style("Watching session table").bold());
        println!("  {} {}", dim.apply_to("Server:"), store.config().base_url);
        println!("  {} {}s", dim.apply_to("Interval:"), period.as_secs());
        println!("  {}", dim.apply_to("Press Ctrl-C to stop"));
        println!();
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => print_event(&event, ctx),
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    info!("Stopping pruner");
    store.close_and_wait().await;
    Ok(())
}

fn print_event(event: &StoreEvent, ctx: &Context) {
    if ctx.json_output {
        let value = match event {
            StoreEvent::PruneCompleted { cutoff } => {
                serde_json::json!({ "event": "prune_completed", "cutoff": cutoff })
            }
            StoreEvent::PruneFailed { cutoff, error } => {
                serde_json::json!({ "event": "prune_failed", "cutoff": cutoff, "error": error })
            }
            StoreEvent::RecordDiscarded { sid, reason } => {
                serde_json::json!({ "event": "record_discarded", "sid": sid, "reason": reason })
            }
            StoreEvent::Closed => serde_json::json!({ "event": "closed" }),
        };
        println!("{}", value);
        return;
    }

    let dim = Style::new().dim();
    match event {
        StoreEvent::PruneCompleted { cutoff } => {
            println!(
                "{} {}",
                Style::new().green().apply_to("● pruned"),
                dim.apply_to(format!("expire <= {}", cutoff))
            );
        }
        StoreEvent::PruneFailed { error, .. } => {
            println!("{} {}", Style::new().red().apply_to("● prune failed"), error);
        }
        StoreEvent::RecordDiscarded { sid, reason } => {
            println!(
                "{} {} {}",
                Style::new().yellow().apply_to("● discarded"),
                sid,
                dim.apply_to(reason)
            );
        }
        StoreEvent::Closed => {}
    }
}
