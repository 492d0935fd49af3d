//! Helpers shared by the service, the API and the admin CLI.
//!
//! - [`url_normalizer`] - Site root parsing and source URL normalization
//! - [`batch_lines`] - Parsing of `old|new` import lines

pub mod batch_lines;
pub mod url_normalizer;
