//! Session store backed by a PostgREST table.
//!
//! This crate persists web sessions in a remote `sessions` table
//! (`sid`, `sess`, `expire`) reached over HTTP:
//! - every operation is a fresh round trip, nothing is cached locally
//! - reads only see rows whose expiry has not passed
//! - a background task prunes expired rows on a fixed interval
//!
//! # Example
//!
//! ```rust,ignore
//! use postgrest_session::{PostgrestSessionStore, SessionStore, StoreConfig};
//!
//! let config = StoreConfig::default()
//!     .with_base_url("http://localhost:6000")
//!     .with_ttl(Duration::from_secs(3600));
//!
//! let store = PostgrestSessionStore::new(config)?;
//! store.set("sid-1", &payload, None).await?;
//! let sess = store.get("sid-1").await?;
//! store.close();
//! ```

mod config;
mod error;
mod event;
mod expiry;
mod pruner;
mod record;
mod store;

pub use config::{
    DEFAULT_PRUNE_INTERVAL, DEFAULT_TABLE, DEFAULT_TIMEOUT_SECS, PruneInterval, StoreConfig,
};
pub use error::{Error, Result};
pub use event::StoreEvent;
pub use expiry::{
    Clock, DEFAULT_SESSION_TTL, ManualClock, SystemClock, compute_expiry, epoch_seconds,
};
pub use record::{SessionPayload, SessionRecord, cookie_max_age};
pub use store::{PostgrestSessionStore, SessionStore};

pub use postgrest_client::{MemoryEndpoint, PostgrestClient, TableEndpoint};
