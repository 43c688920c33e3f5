//! Raspe Core - Foundation crate for the raspe harvester.
//!
//! This crate provides shared types, error handling and configuration
//! management that the query, harvest and source crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Search requests, page ranges and identifiers
//! - [`table`] - Row/table model produced by parsers
//! - [`dates`] - Date parameter validation and normalization
//! - [`credentials`] - API key resolution from parameters or environment
//!
//! # Example
//!
//! ```rust
//! use raspe_core::{AppConfig, SearchRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.harvest.max_attempts, 3);
//!
//! let mut request = SearchRequest::new()
//!     .with_list("termo", ["vacina", "dengue"])
//!     .with_param("data_inicio", "01/02/2024");
//! request.validate()?;
//! assert_eq!(request.scalar("data_inicio"), Some("2024-02-01"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod credentials;
pub mod dates;
pub mod error;
pub mod table;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, BrowserConfig, HarvestConfig, HttpConfig};
pub use credentials::resolve_api_key;
pub use error::{ConfigError, ConfigResult, RaspeError, Result};
pub use table::{Row, Table};
pub use types::{PageRange, ParamValue, PayloadFormat, SearchParams, SearchRequest, SourceId};
