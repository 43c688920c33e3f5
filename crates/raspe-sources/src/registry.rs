//! Lookup of concrete sources by identifier.

use crate::{camara, cfm, cnj, datalegis, folha, ipea, nyt, presidencia, senado};
use raspe_browser::PaginationStrategy;
use raspe_core::{AppConfig, SourceId};
use raspe_harvest::{HarvestError, Result, Source};
use tracing::info;

/// Settings shared by every source constructor.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    /// Application configuration (HTTP, browser and harvest sections)
    pub config: AppConfig,
    /// Explicit API key for sources that need one
    pub api_key: Option<String>,
    /// Endpoint override, mainly for tests and mirrors
    pub endpoint: Option<String>,
    /// Browser pagination override for navigated sources
    pub pagination: Option<PaginationStrategy>,
}

impl SourceOptions {
    /// Options carrying `config` and nothing else.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Override the browser pagination strategy.
    #[must_use]
    pub fn with_pagination(mut self, strategy: PaginationStrategy) -> Self {
        self.pagination = Some(strategy);
        self
    }

    /// The endpoint override, or `default`.
    #[must_use]
    pub fn endpoint_or(&self, default: &str) -> String {
        self.endpoint.clone().unwrap_or_else(|| default.to_string())
    }
}

type Constructor = fn(&SourceOptions) -> Result<Source>;

/// A registered source.
#[derive(Debug, Clone, Copy)]
pub struct SourceEntry {
    /// Identifier used on the command line
    pub id: &'static str,
    /// One-line description
    pub description: &'static str,
    /// Whether the source needs an API key
    pub needs_api_key: bool,
    /// Whether the source drives a browser
    pub browser: bool,
    build: Constructor,
}

const ENTRIES: &[SourceEntry] = &[
    SourceEntry {
        id: ipea::ID,
        description: "IPEA publications",
        needs_api_key: false,
        browser: false,
        build: ipea::build,
    },
    SourceEntry {
        id: presidencia::ID,
        description: "Federal legislation (Presidency portal)",
        needs_api_key: false,
        browser: false,
        build: presidencia::build,
    },
    SourceEntry {
        id: folha::ID,
        description: "Folha de S.Paulo news",
        needs_api_key: false,
        browser: false,
        build: folha::build,
    },
    SourceEntry {
        id: cnj::ID,
        description: "CNJ court communications",
        needs_api_key: false,
        browser: false,
        build: cnj::build,
    },
    SourceEntry {
        id: senado::ID,
        description: "Federal legislation (Senate search)",
        needs_api_key: false,
        browser: false,
        build: senado::build,
    },
    SourceEntry {
        id: camara::ID,
        description: "Federal legislation (Chamber of Deputies search)",
        needs_api_key: false,
        browser: false,
        build: camara::build,
    },
    SourceEntry {
        id: cfm::ID,
        description: "CFM and CRM medical regulations",
        needs_api_key: false,
        browser: false,
        build: cfm::build,
    },
    SourceEntry {
        id: nyt::ID,
        description: "New York Times articles",
        needs_api_key: true,
        browser: false,
        build: nyt::build,
    },
    SourceEntry {
        id: datalegis::ANS.id,
        description: "ANS regulatory acts (Datalegis)",
        needs_api_key: false,
        browser: true,
        build: datalegis::build_ans,
    },
    SourceEntry {
        id: datalegis::ANVISA.id,
        description: "ANVISA regulatory acts (Datalegis)",
        needs_api_key: false,
        browser: true,
        build: datalegis::build_anvisa,
    },
];

/// Every source raspe knows how to harvest.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceRegistry;

impl SourceRegistry {
    /// Create the registry.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// All registered sources, in display order.
    #[must_use]
    pub fn entries(&self) -> &'static [SourceEntry] {
        ENTRIES
    }

    /// Registered identifiers.
    #[must_use]
    pub fn ids(&self) -> Vec<&'static str> {
        ENTRIES.iter().map(|e| e.id).collect()
    }

    /// Look up an entry.
    pub fn get(&self, id: &str) -> Result<&'static SourceEntry> {
        let id = SourceId::new(id.trim().to_lowercase())?;
        ENTRIES
            .iter()
            .find(|e| e.id == id.as_str())
            .ok_or_else(|| {
                HarvestError::Validation(format!(
                    "unknown source '{id}', expected one of: {}",
                    self.ids().join(", ")
                ))
            })
    }

    /// Assemble the source registered as `id`.
    pub fn build(&self, id: &str, options: &SourceOptions) -> Result<Source> {
        let entry = self.get(id)?;
        let source = (entry.build)(options)?;
        info!(source = entry.id, "Source ready");
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raspe_harvest::PageScheme;

    #[test]
    fn test_ids_are_unique_and_valid() {
        let registry = SourceRegistry::new();
        let mut ids = registry.ids();
        for id in &ids {
            assert!(SourceId::new(*id).is_ok(), "{id}");
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), registry.entries().len());
    }

    #[test]
    fn test_build_by_id() {
        let registry = SourceRegistry::new();
        let source = registry.build("Folha", &SourceOptions::default()).unwrap();
        assert_eq!(source.name(), "folha");

        for id in ["senado", "camara", "cfm"] {
            let source = registry.build(id, &SourceOptions::default()).unwrap();
            assert!(matches!(source.profile.scheme, PageScheme::Affine(_)), "{id}");
        }

        let ans = registry.build("ans", &SourceOptions::default()).unwrap();
        assert_eq!(ans.profile.scheme, PageScheme::Navigated);
        assert_eq!(ans.profile.max_pages, Some(100));
    }

    #[test]
    fn test_unknown_source() {
        let err = SourceRegistry::new()
            .build("jusbrasil", &SourceOptions::default())
            .unwrap_err();
        assert!(matches!(err, HarvestError::Validation(msg) if msg.contains("ipea")));
    }

    #[test]
    fn test_api_key_source_needs_key() {
        let options = SourceOptions::default().with_api_key("secret");
        let source = SourceRegistry::new().build("nyt", &options).unwrap();
        assert_eq!(source.profile.scheme, PageScheme::Cursor);
    }

    #[test]
    fn test_endpoint_override() {
        let options = SourceOptions::default().with_endpoint("http://127.0.0.1:1234/search");
        assert_eq!(options.endpoint_or("https://x"), "http://127.0.0.1:1234/search");
        assert_eq!(SourceOptions::default().endpoint_or("https://x"), "https://x");
    }
}
