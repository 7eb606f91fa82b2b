use thiserror::Error;

/// Unified error type for all Strata operations.
///
/// The execution core treats every error as fatal: there is no retry, no
/// partial delivery, and no degraded mode. Errors propagate upward through
/// the call stack with `?` and surface to the caller of `execute`, which
/// either returns a complete output table or this error.
#[derive(Error, Debug)]
pub enum Error {
    /// The plan is structurally invalid.
    ///
    /// Raised during plan validation before any operator runs: out-of-range
    /// node or child indices, attribute indices past a child's output width,
    /// base table ids that do not fit the string-reference packing, or
    /// cycles in the node graph.
    #[error("malformed plan: {0}")]
    MalformedPlan(String),

    /// A string reference or scan touched a page that does not exist.
    ///
    /// Carries the full reference coordinates so the offending table can be
    /// identified from the message alone.
    #[error("page out of range: table {table_id} column {column_id} page {page_id}")]
    PageOutOfRange {
        table_id: usize,
        column_id: usize,
        page_id: usize,
    },

    /// A page header or payload violates the columnar page format.
    ///
    /// Typically a `num_values`/`num_rows` combination that cannot fit in
    /// one page, or an offset array pointing past the payload.
    #[error("corrupt page: {0}")]
    CorruptPage(String),

    /// Invalid user input or API parameter.
    #[error("invalid argument: {0}")]
    InvalidArgumentError(String),

    /// Internal error indicating a bug or violated invariant.
    ///
    /// This should never occur during normal operation; the message records
    /// which invariant broke.
    #[error("an internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// Create an internal error from any displayable value.
    #[inline]
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        Error::Internal(err.to_string())
    }
}
