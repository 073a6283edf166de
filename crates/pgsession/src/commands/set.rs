//! Set command - creates or replaces a session.

use anyhow::Result;
use clap::Args;
use console::Style;
use postgrest_session::{SessionStore, cookie_max_age};
use serde::Serialize;

use super::{Context, max_age, parse_payload};

/// Arguments for the set command.
#[derive(Args, Debug)]
pub struct SetArgs {
    /// Session id
    pub sid: String,

    /// Session payload as a JSON object
    pub payload: String,

    /// Cookie max-age in milliseconds
    #[arg(long)]
    pub max_age: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SetOutput<'a> {
    sid: &'a str,
    expire: i64,
}

/// Run the set command.
pub async fn run(args: SetArgs, ctx: &Context) -> Result<()> {
    let sess = parse_payload(&args.payload)?;
    let store = ctx.one_shot_store()?;
    let max_age = max_age(args.max_age);

    let expire = store.compute_expiry(max_age.or_else(|| cookie_max_age(&sess)));
    store.set(&args.sid, &sess, max_age).await?;

    if ctx.json_output {
        let output = SetOutput {
            sid: &args.sid,
            expire,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let green = Style::new().green();
        let dim = Style::new().dim();
        println!("{} {}", green.apply_to("Stored"), args.sid);
        println!("  {} {}", dim.apply_to("Expires:"), expire);
    }

    Ok(())
}
