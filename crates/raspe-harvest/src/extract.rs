//! Turning a session's payloads into rows.

use crate::error::Result;
use crate::session::HarvestSession;
use crate::source::Parser;
use raspe_core::Row;

/// Parse every payload of `session`, in page order.
///
/// A payload that fails to parse is logged and contributes no rows.
pub fn extract_rows(session: &HarvestSession, parser: &dyn Parser) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    for path in session.payload_files()? {
        match parser.parse(&path) {
            Ok(parsed) => {
                tracing::debug!(path = %path.display(), rows = parsed.len(), "Parsed payload");
                rows.extend(parsed);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to parse payload, skipping");
            }
        }
    }
    Ok(rows)
}
