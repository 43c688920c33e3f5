//! Collapsing rows that point at the same resource.

use raspe_core::{Row, Table};
use std::collections::HashMap;

/// Default canonical key column.
pub const DEFAULT_KEY_COLUMN: &str = "link";

/// Separator between merged provenance values.
pub const PROVENANCE_SEPARATOR: &str = ", ";

/// Merges rows sharing a canonical key.
///
/// Output has one row per distinct key, placed where that key first
/// appeared. The provenance column of a merged row is every contributing
/// value in encounter order, repeats included; every other column comes from
/// the first row. Keys are compared exactly as stored. Rows with a blank or
/// missing key pass through untouched.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    key_column: String,
    provenance_column: String,
}

impl ResultAggregator {
    /// Aggregator keyed on `key_column`, merging `provenance_column`.
    pub fn new(key_column: impl Into<String>, provenance_column: impl Into<String>) -> Self {
        Self {
            key_column: key_column.into(),
            provenance_column: provenance_column.into(),
        }
    }

    /// Collapse duplicate keys in `table`.
    #[must_use]
    pub fn aggregate(&self, table: Table) -> Table {
        let mut output: Vec<Row> = Vec::with_capacity(table.len());
        let mut groups: HashMap<String, usize> = HashMap::new();
        let mut merged = 0usize;

        for row in table {
            let key = row
                .get(&self.key_column)
                .filter(|k| !k.trim().is_empty())
                .map(ToString::to_string);

            let Some(key) = key else {
                output.push(row);
                continue;
            };

            if let Some(&index) = groups.get(&key) {
                if let Some(extra) = row.get(&self.provenance_column) {
                    let target = &mut output[index];
                    let joined = match target.get(&self.provenance_column) {
                        Some(existing) => format!("{existing}{PROVENANCE_SEPARATOR}{extra}"),
                        None => extra.to_string(),
                    };
                    target.set(self.provenance_column.clone(), joined);
                }
                merged += 1;
            } else {
                groups.insert(key, output.len());
                output.push(row);
            }
        }

        tracing::debug!(
            key_column = %self.key_column,
            rows = output.len(),
            merged,
            "Aggregated duplicate rows"
        );
        Table::from(output)
    }
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_COLUMN, crate::fanout::PROVENANCE_COLUMN)
    }
}
