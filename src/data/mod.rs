/// Dynamic response values.
pub mod value;

/// Error types for schema building, validation and execution.
pub mod error;

/// The serializable query result.
pub mod result;

/// Query variables as submitted by a client.
pub mod query;
