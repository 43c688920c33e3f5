//! Source capabilities and their composition.
//!
//! Every remote source is assembled from three narrow capabilities plus a
//! transport: a [`QueryBuilder`] that turns caller parameters into the
//! source-native query, a [`PageCountProbe`] that reads the initial response,
//! and a [`Parser`] that turns one persisted payload into rows.

use crate::error::Result;
use crate::request::{PageRequest, Query};
use crate::transport::Transport;
use raspe_core::{PageRange, PayloadFormat, Row, SearchParams};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Builds the source-native base query from validated parameters.
pub trait QueryBuilder: Send + Sync {
    /// Parameter names this source understands.
    fn accepted_params(&self) -> &[&'static str];

    /// Build the base query. Called once per harvest, before any network call.
    fn build(&self, params: &SearchParams) -> Result<Query>;

    /// Derive the query for the page following `cursor` (cursor pagination).
    fn with_cursor(&self, base: &Query, cursor: &str) -> Query {
        base.clone().with("cursor", cursor)
    }

    /// Upper bound on pages implied by the parameters (e.g. a result cap).
    fn page_limit(&self, _params: &SearchParams) -> Result<Option<u32>> {
        Ok(None)
    }
}

/// Reads the initial response of a harvest.
pub trait PageCountProbe: Send + Sync {
    /// Total number of result pages; `None` or non-positive means none.
    fn probe(&self, payload: &[u8]) -> Option<i64>;

    /// Cursor for the page after the one in `payload` (cursor pagination).
    fn next_cursor(&self, _payload: &[u8]) -> Option<String> {
        None
    }
}

/// Converts one persisted payload into rows.
pub trait Parser: Send + Sync {
    /// Parse the file at `path`.
    fn parse(&self, path: &Path) -> Result<Vec<Row>>;
}

/// Affine mapping from a logical page to the value a source expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTransform {
    /// Query parameter carrying the page marker
    pub param: String,
    /// `effective = page * multiplier + increment`
    pub multiplier: i64,
    /// See `multiplier`
    pub increment: i64,
    /// Optional parameter that receives `effective - 1`
    pub previous_param: Option<String>,
}

impl PageTransform {
    /// Identity transform on `param`.
    pub fn new(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            multiplier: 1,
            increment: 0,
            previous_param: None,
        }
    }

    /// Set multiplier and increment.
    #[must_use]
    pub fn affine(mut self, multiplier: i64, increment: i64) -> Self {
        self.multiplier = multiplier;
        self.increment = increment;
        self
    }

    /// Also send `effective - 1` under `param`.
    #[must_use]
    pub fn with_previous(mut self, param: impl Into<String>) -> Self {
        self.previous_param = Some(param.into());
        self
    }

    /// Value embedded in the request for logical page `page`.
    #[must_use]
    pub fn effective(&self, page: u32) -> i64 {
        i64::from(page) * self.multiplier + self.increment
    }

    /// Copy of `base` carrying the page marker(s) for `page`.
    #[must_use]
    pub fn apply(&self, base: &Query, page: u32) -> Query {
        let effective = self.effective(page);
        let mut query = base.clone();
        query.set(self.param.clone(), effective);
        if let Some(previous) = &self.previous_param {
            query.set(previous.clone(), effective - 1);
        }
        query
    }
}

/// How a source addresses pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageScheme {
    /// Page marker embedded in the query via an affine transform
    Affine(PageTransform),
    /// Opaque cursor taken from the previous response
    Cursor,
    /// The transport reaches the page itself (clicking links, picking an option)
    Navigated,
}

impl PageScheme {
    /// Probe request for `base`.
    #[must_use]
    pub fn probe_request(&self, base: &Query) -> PageRequest {
        match self {
            Self::Affine(transform) => PageRequest::probe(transform.apply(base, 1)),
            Self::Cursor | Self::Navigated => PageRequest::probe(base.clone()),
        }
    }

    /// Request for logical page `page` (affine and navigated schemes).
    #[must_use]
    pub fn page_request(&self, base: &Query, page: u32) -> PageRequest {
        match self {
            Self::Affine(transform) => PageRequest::page(page, transform.apply(base, page)),
            Self::Cursor | Self::Navigated => PageRequest::page(page, base.clone()),
        }
    }
}

/// Static description of a source.
#[derive(Debug, Clone)]
pub struct SourceProfile {
    /// Identifier, also used in payload file names
    pub name: String,
    /// Payload format on disk
    pub format: PayloadFormat,
    /// Page addressing
    pub scheme: PageScheme,
    /// Cap on the page count reported by the probe
    pub max_pages: Option<u32>,
    /// Politeness interval overriding the configured default
    pub pacing: Option<Duration>,
}

impl SourceProfile {
    /// Profile with no page cap and default pacing.
    pub fn new(name: impl Into<String>, format: PayloadFormat, scheme: PageScheme) -> Self {
        Self {
            name: name.into(),
            format,
            scheme,
            max_pages: None,
            pacing: None,
        }
    }

    /// Cap the page count.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Override pacing.
    #[must_use]
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = Some(pacing);
        self
    }
}

/// A fully assembled source.
#[derive(Clone)]
pub struct Source {
    /// Static description
    pub profile: SourceProfile,
    /// Query construction
    pub builder: Arc<dyn QueryBuilder>,
    /// Page count and cursor extraction
    pub probe: Arc<dyn PageCountProbe>,
    /// Payload parsing
    pub parser: Arc<dyn Parser>,
    /// Wire access, shared by every harvest of one run
    pub transport: Arc<dyn Transport>,
}

impl Source {
    /// Source name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// Build the base query after rejecting unknown parameters.
    pub fn build_query(&self, params: &SearchParams) -> Result<Query> {
        params.reject_unknown(&self.profile.name, self.builder.accepted_params())?;
        self.builder.build(params)
    }

    /// Page range for one harvest: the caller's request narrowed by any
    /// limit the parameters imply.
    pub fn page_range(
        &self,
        params: &SearchParams,
        requested: Option<PageRange>,
    ) -> Result<Option<PageRange>> {
        Ok(match self.builder.page_limit(params)? {
            Some(limit) => Some(requested.unwrap_or(PageRange::all(limit)).clamp_to(limit)),
            None => requested,
        })
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}
