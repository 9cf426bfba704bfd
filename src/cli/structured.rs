//! CLI handlers for `extract` and `prompt`.

use std::io::Read;
use std::path::Path;

use crate::error::Result;
use crate::structured::{extract_json_with_strategy, OutputSchema, StructuredQuery};

use super::{ExtractArgs, PromptArgs};

/// Handle `helm extract [FILE] [--schema SCHEMA]`.
pub fn handle_extract(args: &ExtractArgs) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let text = match &args.file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let schema = args.schema.as_deref().map(load_schema).transpose()?;
    println!("{}", extract(&text, schema.as_ref())?);
    Ok(())
}

/// Handle `helm prompt QUERY --schema SCHEMA`.
pub fn handle_prompt(args: &PromptArgs) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let schema = load_schema(&args.schema)?;
    println!("{}", StructuredQuery::with_schema(args.query.as_str(), &schema).text());
    Ok(())
}

/// Extract (and optionally validate) a JSON value, rendered pretty.
pub fn extract(text: &str, schema: Option<&OutputSchema>) -> Result<String> {
    let (value, strategy) = extract_json_with_strategy(text)?;
    tracing::debug!(?strategy, "extracted");
    if let Some(schema) = schema {
        schema.validate(&value)?;
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Read a JSON Schema document from disk.
pub fn load_schema(path: &Path) -> Result<OutputSchema> {
    let raw = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    Ok(OutputSchema::new(value))
}
