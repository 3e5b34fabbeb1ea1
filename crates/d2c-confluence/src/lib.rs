//! Confluence REST client for docs2confluence.
//!
//! [`ConfluenceClient`] talks to the content API over blocking HTTP and
//! implements [`d2c_sync::RemotePages`], so it can be handed straight to a
//! [`d2c_sync::SyncEngine`].
//!
//! # Example
//!
//! ```ignore
//! use d2c_confluence::ConfluenceClient;
//! use d2c_sync::RemotePages;
//!
//! let client = ConfluenceClient::with_basic_auth(
//!     "https://example.atlassian.net/wiki",
//!     "me@example.com",
//!     "api-token",
//! );
//! let page = client.get_page("DOCS", "Getting Started")?;
//! ```

pub mod auth;
mod client;
mod error;
mod remote;
pub mod types;

pub use auth::{Auth, OAuth1Auth};
pub use client::ConfluenceClient;
pub use error::ConfluenceError;
