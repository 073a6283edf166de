//! HTTP client for PostgREST-style tabular endpoints.
//!
//! This crate exposes a small row-level CRUD surface over a remote table:
//! every call names a table and a [`Filter`], and the endpoint answers with
//! JSON rows.
//!
//! # Example
//!
//! ```no_run
//! use postgrest_client::{Filter, PostgrestClient, Result, TableEndpoint};
//!
//! # async fn example() -> Result<()> {
//! let client = PostgrestClient::builder()
//!     .base_url("http://localhost:6000")
//!     .header("Authorization", "Bearer secret")
//!     .build()?;
//!
//! let row = client
//!     .read_one("sessions", &Filter::new().eq("sid", "abc"))
//!     .await?;
//! println!("{:?}", row);
//! # Ok(())
//! # }
//! ```
//!
//! The [`TableEndpoint`] trait is the seam: [`PostgrestClient`] talks HTTP,
//! [`MemoryEndpoint`] keeps rows in memory for tests.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod filter;
pub mod memory;

pub use client::{ClientBuilder, DEFAULT_BASE_URL, PostgrestClient};
pub use endpoint::TableEndpoint;
pub use error::{Error, Result};
pub use filter::{Condition, Filter, Op};
pub use memory::{EndpointCall, MemoryEndpoint, Operation};
