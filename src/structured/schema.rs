//! Output schemas and validation of parsed responses against them.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{HelmError, Result};

/// JSON Schema describing the shape a structured response must have.
///
/// Build one from a hand-written schema with [`OutputSchema::new`] or derive
/// it from a Rust type with [`OutputSchema::for_type`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputSchema(serde_json::Value);

impl OutputSchema {
    pub fn new(schema: serde_json::Value) -> Self {
        Self(schema)
    }

    /// Derive the schema of `T` via `schemars`.
    pub fn for_type<T: JsonSchema>() -> Result<Self> {
        let root = schemars::schema_for!(T);
        Ok(Self(serde_json::to_value(root)?))
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Pretty-printed schema, as embedded in prompts.
    pub fn describe(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_default()
    }

    /// Compile the schema once for repeated validation. Fails with
    /// [`HelmError::InvalidSchema`] when the document is not a usable schema.
    pub fn compile(&self) -> Result<CompiledSchema> {
        let validator = jsonschema::JSONSchema::compile(&self.0)
            .map_err(|e| HelmError::InvalidSchema(e.to_string()))?;
        Ok(CompiledSchema {
            source: self.0.clone(),
            validator,
        })
    }

    /// Check `value` against the schema. Nothing is coerced: a `"30"` where
    /// a number is expected is a violation.
    pub fn validate(&self, value: &serde_json::Value) -> Result<()> {
        self.compile()?.validate(value)
    }

    /// Validate, then deserialize into `T`.
    pub fn validate_into<T: DeserializeOwned>(&self, value: serde_json::Value) -> Result<T> {
        self.compile()?.validate_into(value)
    }
}

/// An [`OutputSchema`] ready to validate values.
pub struct CompiledSchema {
    source: serde_json::Value,
    validator: jsonschema::JSONSchema,
}

impl CompiledSchema {
    pub fn validate(&self, value: &serde_json::Value) -> Result<()> {
        if let Err(errors) = self.validator.validate(value) {
            let message = errors
                .map(|err| {
                    let path = err.instance_path.to_string();
                    if path.is_empty() {
                        err.to_string()
                    } else {
                        format!("{path}: {err}")
                    }
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(HelmError::schema_validation(&self.source, value.clone(), message));
        }
        Ok(())
    }

    /// Validate, then deserialize into `T`. A value that passes the schema but
    /// still does not fit `T` is also a schema violation.
    pub fn validate_into<T: DeserializeOwned>(&self, value: serde_json::Value) -> Result<T> {
        self.validate(&value)?;
        serde_json::from_value(value.clone())
            .map_err(|e| HelmError::schema_validation(&self.source, value, e.to_string()))
    }
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl From<serde_json::Value> for OutputSchema {
    fn from(schema: serde_json::Value) -> Self {
        Self::new(schema)
    }
}
