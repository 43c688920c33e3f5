//! Browser automation for search portals that render results client-side
//! or sit behind an anti-bot challenge.
//!
//! Provides headless Chromium control with a randomized fingerprint, a
//! bounded poller for challenge pages and result-page navigation.

pub mod actions;
pub mod challenge;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod pagination;

pub use actions::{BrowserActions, BrowserPage};
pub use challenge::{poll_until, wait_for_challenge, CHALLENGE};
pub use engine::BrowserEngine;
pub use error::{BrowserError, Result};
pub use pagination::PaginationStrategy;
