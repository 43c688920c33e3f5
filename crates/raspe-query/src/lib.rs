//! Boolean search expression expansion.
//!
//! Search portals rarely understand nested boolean queries. This crate turns
//! an expression such as `(doença OU síndrome) E rara` into the flat list of
//! concrete searches that together cover it:
//!
//! ```rust
//! use raspe_query::expand;
//!
//! let terms = expand("(doença OU síndrome) E rara").unwrap();
//! assert_eq!(terms, vec!["doença rara", "síndrome rara"]);
//! ```
//!
//! Operators are `E`/`AND` (Cartesian product) and `OU`/`OR` (union), with
//! AND binding tighter than OR and parentheses for grouping.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod expand;

pub use error::{QueryError, Result};
pub use expand::{expand, parse, ExpressionNode};
