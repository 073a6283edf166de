//! Destroy command - deletes a session.

use anyhow::Result;
use clap::Args;
use postgrest_session::SessionStore;

use super::Context;

/// Arguments for the destroy command.
#[derive(Args, Debug)]
pub struct DestroyArgs {
    /// Session id
    pub sid: String,
}

/// Run the destroy command.
pub async fn run(args: DestroyArgs, ctx: &Context) -> Result<()> {
    let store = ctx.one_shot_store()?;
    store.destroy(&args.sid).await?;

    if ctx.json_output {
        println!("{}", serde_json::json!({ "sid": args.sid, "destroyed": true }));
    } else {
        println!("Destroyed {}", args.sid);
    }

    Ok(())
}
