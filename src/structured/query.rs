//! Query text sent to the loop, optionally carrying schema instructions.

use super::schema::OutputSchema;

/// The task text handed to the agent loop.
///
/// Built once per execution. When a schema is attached the text is the
/// caller's query followed by the schema and an instruction to answer with
/// that JSON object only; the caller's original string is kept untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredQuery {
    original: String,
    text: String,
    schema: Option<OutputSchema>,
}

impl StructuredQuery {
    pub fn new(query: impl Into<String>, schema: Option<&OutputSchema>) -> Self {
        let original = query.into();
        let text = match schema {
            Some(schema) => format!(
                "{original}\n\n\
                 Please respond with a valid JSON object that matches this JSON Schema:\n\
                 ```json\n{}\n```\n\n\
                 Respond ONLY with the JSON object, no additional text.",
                schema.describe()
            ),
            None => original.clone(),
        };
        Self {
            original,
            text,
            schema: schema.cloned(),
        }
    }

    pub fn plain(query: impl Into<String>) -> Self {
        Self::new(query, None)
    }

    pub fn with_schema(query: impl Into<String>, schema: &OutputSchema) -> Self {
        Self::new(query, Some(schema))
    }

    /// The caller's query, exactly as given.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// The text sent to the loop.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn schema(&self) -> Option<&OutputSchema> {
        self.schema.as_ref()
    }

    pub fn is_structured(&self) -> bool {
        self.schema.is_some()
    }
}
