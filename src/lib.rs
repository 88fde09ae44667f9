//! Fixed-window admission gate for rate-limited submission APIs.
//!
//! A [`window_limit::Limiter`] admits at most `max_requests` callers per `window`.
//! Callers that find the window saturated wait until the background reset task
//! clears the counter, then re-check capacity. The gate is shared by every clone of
//! a [`documents::DocumentClient`], so concurrent submitters never exceed the
//! external service's quota.
//!
//! # Algorithm Overview
//!
//! 1. **Admit**: an atomic compare-and-swap increments the counter only while it is
//!    below the limit.
//! 2. **Wait**: saturated callers park on a notification, bounded by one window.
//! 3. **Reset**: a tokio task zeroes the counter every `window`, starting one window
//!    after construction, and wakes all waiters.
//!
//! # Basic Usage
//! ```no_run
//! use std::time::Duration;
//! use submission_gate::documents::{Document, DocumentClient, DocumentClientConfig, Signature};
//! use submission_gate::window_limit::WindowLimitSettings;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DocumentClientConfig {
//!     limit: WindowLimitSettings::builder()
//!         .window(Duration::from_secs(1))
//!         .max_requests(2)
//!         .build(),
//!     ..Default::default()
//! };
//! let mut client = DocumentClient::new(config)?;
//! let body = client
//!     .create_document(&Document::default(), &Signature::from("signature"))
//!     .await?;
//! println!("{body}");
//! # Ok(())
//! # }
//! ```
//!
//! # Metrics
//! Emits metrics through the handles in [`window_limit::internal_event`].
pub mod documents;
pub mod window_limit;

#[macro_use]
extern crate tracing;

pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
