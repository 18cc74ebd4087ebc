/// Coercion of input values according to schema types.
pub mod coercion;

/// Pre-built coercers that turn raw input into resolver argument objects.
pub(crate) mod packer;
