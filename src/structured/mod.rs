//! Structured output: schema-bearing queries, JSON extraction, validation.

pub mod extract;
pub mod query;
pub mod schema;

pub use extract::{extract_json, extract_json_with_strategy, ExtractStrategy};
pub use query::StructuredQuery;
pub use schema::{CompiledSchema, OutputSchema};
