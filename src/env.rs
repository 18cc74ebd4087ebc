//! Environment-variable gates, read once.

use lazy_static::lazy_static;

lazy_static! {
    /// Log a timing line for every executed query.
    pub static ref LOG_GQL_TIMING: bool = std::env::var_os("GRAPHQL_LOG_TIMING").is_some();
}
