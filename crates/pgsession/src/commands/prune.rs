//! Prune command - runs a single prune pass.

use anyhow::Result;
use clap::Args;
use console::Style;

use super::Context;

/// Arguments for the prune command.
#[derive(Args, Debug)]
pub struct PruneArgs {}

/// Run the prune command.
pub async fn run(_args: PruneArgs, ctx: &Context) -> Result<()> {
    let store = ctx.one_shot_store()?;
    store.prune_sessions().await?;

    if ctx.json_output {
        println!("{}", serde_json::json!({ "pruned": true, "table": ctx.config.table }));
    } else {
        let green = Style::new().green();
        let dim = Style::new().dim();
        println!("{}", green.apply_to("Expired sessions removed"));
        println!("  {} {}", dim.apply_to("Table:"), ctx.config.table);
    }

    Ok(())
}
