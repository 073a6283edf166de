//! Touch command - extends a session's expiry.

use anyhow::Result;
use clap::Args;
use console::Style;
use postgrest_session::SessionStore;

use super::{Context, max_age, parse_payload};

/// Arguments for the touch command.
#[derive(Args, Debug)]
pub struct TouchArgs {
    /// Session id
    pub sid: String,

    /// Session payload, consulted only for its cookie max-age
    #[arg(long, default_value = "{}")]
    pub payload: String,

    /// Cookie max-age in milliseconds
    #[arg(long)]
    pub max_age: Option<u64>,
}

/// Run the touch command.
pub async fn run(args: TouchArgs, ctx: &Context) -> Result<()> {
    let sess = parse_payload(&args.payload)?;
    let store = ctx.one_shot_store()?;
    store.touch(&args.sid, &sess, max_age(args.max_age)).await?;

    if ctx.json_output {
        println!("{}", serde_json::json!({ "sid": args.sid, "touched": true }));
    } else {
        let dim = Style::new().dim();
        println!("Touched {}", args.sid);
        if ctx.verbose {
            println!("  {} {}", dim.apply_to("Table:"), ctx.config.table);
        }
    }

    Ok(())
}
