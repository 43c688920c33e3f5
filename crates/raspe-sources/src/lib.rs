//! Raspe Sources - the search portals raspe knows how to harvest.
//!
//! Each source module provides a query builder, a page-count probe and a
//! payload parser, and picks a transport: plain HTTP for most portals, a
//! driven browser for the Datalegis portals behind an anti-bot challenge.
//! The [`SourceRegistry`] builds them by identifier.
//!
//! # Example
//!
//! ```rust,no_run
//! use raspe_core::{AppConfig, SearchRequest};
//! use raspe_harvest::FanOutRunner;
//! use raspe_sources::{SourceOptions, SourceRegistry};
//!
//! # async fn run() -> raspe_harvest::Result<()> {
//! let config = AppConfig::default();
//! let source = SourceRegistry::new().build("ipea", &SourceOptions::new(config.clone()))?;
//! let request = SearchRequest::new().with_param("pesquisa", "vacina");
//! let table = FanOutRunner::from_config(config.harvest).harvest(&source, &request).await?;
//! println!("{} publications", table.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod camara;
pub mod cfm;
pub mod cnj;
pub mod datalegis;
pub mod folha;
mod html;
pub mod ipea;
pub mod nyt;
pub mod presidencia;
pub mod registry;
pub mod senado;

pub use registry::{SourceEntry, SourceOptions, SourceRegistry};
