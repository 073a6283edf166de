//! Get command - prints a live session payload.

use anyhow::Result;
use clap::Args;
use console::Style;
use postgrest_session::SessionStore;

use super::Context;

/// Arguments for the get command.
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Session id
    pub sid: String,
}

/// Run the get command.
pub async fn run(args: GetArgs, ctx: &Context) -> Result<()> {
    let store = ctx.one_shot_store()?;
    let sess = store.get(&args.sid).await?;

    if ctx.json_output {
        let value = sess.map(serde_json::Value::Object);
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    match sess {
        Some(sess) => {
            println!("{}", serde_json::to_string_pretty(&sess)?);
        }
        None => {
            let yellow = Style::new().yellow();
            println!("{}", yellow.apply_to("No live session"));
            println!("  {} {}", dim.apply_to("Sid:"), args.sid);
        }
    }

    Ok(())
}
