//! Pagination state machine.
//!
//! One [`PaginationController`] drives one harvest:
//! `Idle -> ProbeCount -> ComputeRange -> FetchLoop -> Done`.
//! A flaky source yields fewer pages, never an aborted harvest; only
//! fatal errors (see [`crate::error::HarvestError::is_fatal`]) escape.

use crate::error::Result;
use crate::fetcher::PageFetcher;
use crate::outcome::FetchOutcome;
use crate::request::{PageRequest, Query};
use crate::session::HarvestSession;
use crate::source::{PageScheme, Source};
use raspe_core::PageRange;
use std::time::Duration;

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestState {
    /// Not started
    Idle,
    /// Fetching the initial response to learn the page count
    ProbeCount,
    /// Intersecting the requested subrange with the page count
    ComputeRange,
    /// Fetching pages in order
    FetchLoop,
    /// Finished; the session holds every page that could be fetched
    Done,
}

/// Effective page range for a result set of `total_pages` pages.
///
/// Without a request this is every page; a requested subrange is clamped so
/// nothing past `total_pages` is fetched. Empty or inverted requests yield an
/// empty range.
#[must_use]
pub fn effective_range(requested: Option<PageRange>, total_pages: u32) -> PageRange {
    match requested {
        None => PageRange::all(total_pages),
        Some(range) => range.clamp_to(total_pages),
    }
}

/// Result of the probe step.
struct Probe {
    total_pages: u32,
    /// Payload of the probe, reused as page 1 by cursor sources
    payload: Option<Vec<u8>>,
}

/// Drives the pages of one harvest into a [`HarvestSession`].
pub struct PaginationController<'a> {
    source: &'a Source,
    fetcher: PageFetcher,
    pacing: Duration,
    state: HarvestState,
}

impl<'a> PaginationController<'a> {
    /// Create a controller for `source`.
    #[must_use]
    pub fn new(source: &'a Source, fetcher: PageFetcher, pacing: Duration) -> Self {
        Self {
            source,
            fetcher,
            pacing: source.profile.pacing.unwrap_or(pacing),
            state: HarvestState::Idle,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> HarvestState {
        self.state
    }

    fn transition(&mut self, next: HarvestState) {
        tracing::debug!(
            source = self.source.name(),
            from = ?self.state,
            to = ?next,
            "State change"
        );
        self.state = next;
    }

    /// Run the harvest for a prebuilt base query.
    ///
    /// Returns the session holding the persisted payloads.
    pub async fn run(
        mut self,
        base: &Query,
        requested: Option<PageRange>,
        mut session: HarvestSession,
    ) -> Result<HarvestSession> {
        self.transition(HarvestState::ProbeCount);
        let probe = self.probe_count(base).await?;

        self.transition(HarvestState::ComputeRange);
        let range = effective_range(requested, probe.total_pages);
        session.set_range(range);
        tracing::info!(
            source = self.source.name(),
            total_pages = probe.total_pages,
            range = %range,
            "Computed page range"
        );

        if range.is_empty() {
            self.transition(HarvestState::Done);
            return Ok(session);
        }

        self.transition(HarvestState::FetchLoop);
        match &self.source.profile.scheme {
            PageScheme::Cursor => self.cursor_loop(base, range, probe, &mut session).await?,
            PageScheme::Affine(_) | PageScheme::Navigated => {
                self.indexed_loop(base, range, &mut session).await?;
            }
        }

        self.transition(HarvestState::Done);
        tracing::info!(
            source = self.source.name(),
            succeeded = session.succeeded(),
            skipped = session.skipped(),
            "Harvest finished"
        );
        Ok(session)
    }

    async fn probe_count(&self, base: &Query) -> Result<Probe> {
        let request = self.source.profile.scheme.probe_request(base);
        let none = Probe {
            total_pages: 0,
            payload: None,
        };

        let payload = match self.fetcher.fetch(&request).await {
            Ok(FetchOutcome::Success { payload, .. }) => payload,
            Ok(FetchOutcome::ClientError { status, body }) => {
                tracing::error!(
                    source = self.source.name(),
                    status,
                    body = %body,
                    "Probe rejected, no pages"
                );
                return Ok(none);
            }
            Ok(other) => {
                tracing::error!(
                    source = self.source.name(),
                    outcome = other.kind(),
                    "Unexpected probe outcome"
                );
                return Ok(none);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::error!(source = self.source.name(), error = %e, "Probe failed, no pages");
                return Ok(none);
            }
        };

        let reported = self.source.probe.probe(&payload);
        let mut total_pages = match reported {
            Some(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
            Some(_) => 0,
            None => {
                tracing::warn!(
                    source = self.source.name(),
                    "Page count missing from probe response"
                );
                0
            }
        };
        if let Some(cap) = self.source.profile.max_pages {
            total_pages = total_pages.min(cap);
        }

        tracing::debug!(source = self.source.name(), total_pages, "Probed page count");
        Ok(Probe {
            total_pages,
            payload: Some(payload),
        })
    }

    async fn indexed_loop(
        &self,
        base: &Query,
        range: PageRange,
        session: &mut HarvestSession,
    ) -> Result<()> {
        for page in range.iter() {
            tokio::time::sleep(self.pacing).await;
            let request = self.source.profile.scheme.page_request(base, page);

            match self.fetcher.fetch(&request).await {
                Ok(FetchOutcome::Success { payload, .. }) => {
                    if let Err(e) = session.persist(page, &payload) {
                        tracing::error!(page, error = %e, "Failed to save page, skipping");
                        session.record_skip();
                    }
                }
                Ok(outcome) => {
                    tracing::warn!(page, outcome = outcome.kind(), "Page not available, skipping");
                    session.record_skip();
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(page, error = %e, "Page failed, skipping");
                    session.record_skip();
                }
            }
        }
        Ok(())
    }

    /// Cursor sources can only walk forward: the probe payload is page 1 and
    /// every later page needs the cursor of the one before it. Pages before
    /// the requested start are fetched but not persisted.
    async fn cursor_loop(
        &self,
        base: &Query,
        range: PageRange,
        probe: Probe,
        session: &mut HarvestSession,
    ) -> Result<()> {
        let Some(first) = probe.payload else {
            return Ok(());
        };

        let mut cursor = self.source.probe.next_cursor(&first);
        if range.start <= 1 {
            if let Err(e) = session.persist(1, &first) {
                tracing::error!(page = 1, error = %e, "Failed to save page, skipping");
                session.record_skip();
            }
        }

        for page in 2..range.end {
            let Some(current) = cursor.take() else {
                tracing::debug!(page, "No cursor for next page, stopping");
                break;
            };

            tokio::time::sleep(self.pacing).await;
            let query = self.source.builder.with_cursor(base, &current);
            let request = PageRequest::page(page, query);

            let payload = match self.fetcher.fetch(&request).await {
                Ok(FetchOutcome::Success { payload, .. }) => payload,
                Ok(outcome) => {
                    tracing::warn!(
                        page,
                        outcome = outcome.kind(),
                        "Page not available, stopping cursor walk"
                    );
                    session.record_skip();
                    break;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(page, error = %e, "Page failed, stopping cursor walk");
                    session.record_skip();
                    break;
                }
            };

            cursor = self.source.probe.next_cursor(&payload);
            if page >= range.start {
                if let Err(e) = session.persist(page, &payload) {
                    tracing::error!(page, error = %e, "Failed to save page, skipping");
                    session.record_skip();
                }
            }
        }
        Ok(())
    }
}
