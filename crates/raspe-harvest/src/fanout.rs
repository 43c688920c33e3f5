//! Running a harvest once per value of a list-valued parameter.

use crate::controller::PaginationController;
use crate::error::Result;
use crate::extract::extract_rows;
use crate::fetcher::PageFetcher;
use crate::request::Query;
use crate::retry::RetryPolicy;
use crate::session::HarvestSession;
use crate::source::Source;
use raspe_core::{HarvestConfig, PageRange, SearchParams, SearchRequest, Table};
use tracing::Instrument;

/// Column holding the search value that produced each row.
pub const PROVENANCE_COLUMN: &str = "termo_busca";

/// Parameter names treated as the search term when nothing fans out.
pub const SEARCH_TERM_PARAMS: &[&str] = &["pesquisa", "termo", "texto", "q", "query", "assunto"];

/// One planned harvest: its base query, pages and the provenance for its rows.
#[derive(Debug)]
struct Iteration {
    query: Query,
    pages: Option<PageRange>,
    provenance: Option<String>,
}

/// Repeats a full harvest per fan-out value and concatenates the results.
#[derive(Debug, Clone)]
pub struct FanOutRunner {
    config: HarvestConfig,
    policy: RetryPolicy,
}

impl FanOutRunner {
    /// Create a runner with an explicit retry policy.
    #[must_use]
    pub fn new(config: HarvestConfig, policy: RetryPolicy) -> Self {
        Self { config, policy }
    }

    /// Create a runner whose retry policy comes from `config`.
    #[must_use]
    pub fn from_config(config: HarvestConfig) -> Self {
        let policy = RetryPolicy::from_config(&config);
        Self::new(config, policy)
    }

    /// Harvest `request` from `source`.
    ///
    /// Every iteration's query is built and validated before the first
    /// network call, so bad input fails without touching the source. The
    /// transport is finished once all iterations are done, even on error.
    pub async fn harvest(&self, source: &Source, request: &SearchRequest) -> Result<Table> {
        let mut request = request.clone();
        request.validate()?;
        let iterations = plan(source, &request)?;

        tracing::info!(
            source = source.name(),
            iterations = iterations.len(),
            pages = ?request.pages(),
            "Starting harvest"
        );

        let result = self.run_all(source, iterations).await;

        if let Err(e) = source.transport.finish().await {
            tracing::warn!(source = source.name(), error = %e, "Failed to close transport");
        }
        result
    }

    async fn run_all(&self, source: &Source, iterations: Vec<Iteration>) -> Result<Table> {
        let mut table = Table::new();
        for iteration in iterations {
            let span = tracing::info_span!(
                "harvest",
                source = source.name(),
                term = iteration.provenance.as_deref().unwrap_or("")
            );
            let mut part = self
                .run_one(source, &iteration.query, iteration.pages)
                .instrument(span)
                .await?;

            if let Some(term) = &iteration.provenance {
                for row in part.rows_mut() {
                    row.set(PROVENANCE_COLUMN, term.clone());
                }
            }
            tracing::info!(
                source = source.name(),
                term = iteration.provenance.as_deref().unwrap_or(""),
                rows = part.len(),
                "Iteration finished"
            );
            table.append(part);
        }
        Ok(table)
    }

    async fn run_one(
        &self,
        source: &Source,
        query: &Query,
        pages: Option<PageRange>,
    ) -> Result<Table> {
        let session = HarvestSession::create(
            &self.config.download_root(),
            source.name(),
            source.profile.format,
        )?;
        let dir = session.dir().to_path_buf();

        let fetcher = PageFetcher::new(source.transport.clone(), self.policy);
        let controller = PaginationController::new(source, fetcher, self.config.pacing());

        let session = match controller.run(query, pages, session).await {
            Ok(session) => session,
            Err(e) => {
                if !self.config.retain_artifacts {
                    if let Err(cleanup) = std::fs::remove_dir_all(&dir) {
                        tracing::warn!(dir = %dir.display(), error = %cleanup, "Failed to remove session");
                    }
                }
                return Err(e);
            }
        };

        let rows = extract_rows(&session, source.parser.as_ref());

        if self.config.retain_artifacts {
            tracing::info!(dir = %session.dir().display(), "Keeping harvest artifacts");
        } else if let Err(e) = session.remove() {
            tracing::warn!(dir = %dir.display(), error = %e, "Failed to remove session");
        }

        Ok(Table::from(rows?))
    }
}

/// Build the base query of every iteration up front.
fn plan(source: &Source, request: &SearchRequest) -> Result<Vec<Iteration>> {
    let fixed = request.fixed_params();

    let Some((key, values)) = request.list_param()? else {
        return Ok(vec![Iteration {
            query: source.build_query(&fixed)?,
            pages: source.page_range(&fixed, request.pages())?,
            provenance: search_term(&fixed).map(ToString::to_string),
        }]);
    };

    values
        .iter()
        .map(|value| {
            let params: SearchParams = fixed.clone().with(key, value.clone());
            Ok(Iteration {
                query: source.build_query(&params)?,
                pages: source.page_range(&params, request.pages())?,
                provenance: Some(value.clone()),
            })
        })
        .collect()
}

/// First parameter, in the caller's order, that names a search term.
fn search_term(params: &SearchParams) -> Option<&str> {
    params
        .iter()
        .find(|(key, _)| SEARCH_TERM_PARAMS.contains(key))
        .map(|(_, value)| value)
}
