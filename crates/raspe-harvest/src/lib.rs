//! Raspe Harvest - pagination engine for uncooperative search sources.
//!
//! A harvest probes a source for its page count, walks the pages one at a
//! time with pacing and retries, stores every raw payload in a session
//! directory and finally hands those payloads to the source's parser.
//!
//! # Modules
//!
//! - [`source`] - Capability traits a source implements, and their composition
//! - [`transport`] - Wire access (HTTP here, browser in `raspe-browser`)
//! - [`retry`] - Retry decisions for classified fetch outcomes
//! - [`fetcher`] - One page through a transport under a retry policy
//! - [`controller`] - The probe / range / fetch-loop state machine
//! - [`session`] - Per-harvest payload storage
//! - [`fanout`] - One harvest per value of a list-valued parameter
//! - [`aggregate`] - Collapsing rows that share a canonical key
//! - [`enrich`] - Link content download and search-word counts
//!
//! # Example
//!
//! ```rust,no_run
//! use raspe_core::{HarvestConfig, SearchRequest};
//! use raspe_harvest::{FanOutRunner, ResultAggregator, Source};
//!
//! # async fn run(source: Source) -> raspe_harvest::Result<()> {
//! let runner = FanOutRunner::from_config(HarvestConfig::default());
//! let request = SearchRequest::new().with_list("pesquisa", ["vacina", "dengue"]);
//! let table = runner.harvest(&source, &request).await?;
//! let table = ResultAggregator::default().aggregate(table);
//! println!("{} rows", table.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod aggregate;
pub mod controller;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod fanout;
pub mod fetcher;
pub mod outcome;
pub mod request;
pub mod retry;
pub mod session;
pub mod source;
pub mod transport;

pub use aggregate::ResultAggregator;
pub use controller::{effective_range, HarvestState, PaginationController};
pub use enrich::{content_column, LinkContentFetcher, TermCounter};
pub use error::{HarvestError, Result};
pub use extract::extract_rows;
pub use fanout::{FanOutRunner, PROVENANCE_COLUMN, SEARCH_TERM_PARAMS};
pub use fetcher::PageFetcher;
pub use outcome::FetchOutcome;
pub use request::{PageRequest, Query, RequestKind};
pub use retry::{RetryDecision, RetryPolicy};
pub use session::HarvestSession;
pub use source::{
    PageCountProbe, PageScheme, PageTransform, Parser, QueryBuilder, Source, SourceProfile,
};
pub use transport::{HttpMethod, HttpTransport, Transport};
