//! Source-native queries and page requests.

/// Ordered key/value pairs sent to a source, as a query string or form body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(Vec<(String, String)>);

impl Query {
    /// Create an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    /// Set a value, replacing in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    /// Look up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Pairs in order.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

/// Which step of the harvest a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Initial request used to discover the page count
    Probe,
    /// A logical page of the result set
    Page(u32),
}

/// One request handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Probe or page
    pub kind: RequestKind,
    /// Query with page markers already applied
    pub query: Query,
}

impl PageRequest {
    /// Probe request for `query`.
    #[must_use]
    pub fn probe(query: Query) -> Self {
        Self {
            kind: RequestKind::Probe,
            query,
        }
    }

    /// Request for logical page `page`.
    #[must_use]
    pub fn page(page: u32, query: Query) -> Self {
        Self {
            kind: RequestKind::Page(page),
            query,
        }
    }

    /// Logical page number, if this is a page request.
    #[must_use]
    pub fn page_number(&self) -> Option<u32> {
        match self.kind {
            RequestKind::Page(n) => Some(n),
            RequestKind::Probe => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_set_replaces_in_place() {
        let mut query = Query::new().with("q", "x").with("sr", 1);
        query.set("q", "y");
        assert_eq!(
            query.pairs(),
            &[
                ("q".to_string(), "y".to_string()),
                ("sr".to_string(), "1".to_string())
            ]
        );
    }

    #[test]
    fn test_page_number() {
        assert_eq!(PageRequest::probe(Query::new()).page_number(), None);
        assert_eq!(PageRequest::page(4, Query::new()).page_number(), Some(4));
    }
}
