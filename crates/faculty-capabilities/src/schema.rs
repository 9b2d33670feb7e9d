//! Schema descriptions for structured extraction.
//!
//! A closed, explicit description of the shape the extraction endpoint
//! should produce: a primitive, a list, or an object with named typed
//! fields. Unsupported kinds are unrepresentable rather than silently
//! flattened.

use serde::{Deserialize, Serialize};

use faculty_core::{Error, Result};

/// Primitive value kinds supported by structured extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    /// UTF-8 string.
    Str,
    /// Signed integer.
    Int,
    /// Floating-point number.
    Float,
    /// Boolean.
    Bool,
}

/// A named, typed field of an object schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name as it should appear in the extracted object.
    pub name: String,
    /// Shape of the field's value.
    pub schema: Schema,
}

/// Shape description for a structured-extraction result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "spec", rename_all = "lowercase")]
pub enum Schema {
    /// A single primitive value.
    Primitive(PrimitiveKind),
    /// A homogeneous list of the inner shape.
    List(Box<Schema>),
    /// An object with named, typed fields.
    Object(Vec<Field>),
}

impl Schema {
    /// A string schema.
    pub fn str() -> Self {
        Self::Primitive(PrimitiveKind::Str)
    }

    /// An integer schema.
    pub fn int() -> Self {
        Self::Primitive(PrimitiveKind::Int)
    }

    /// A float schema.
    pub fn float() -> Self {
        Self::Primitive(PrimitiveKind::Float)
    }

    /// A boolean schema.
    pub fn bool() -> Self {
        Self::Primitive(PrimitiveKind::Bool)
    }

    /// A list of `item` values.
    pub fn list(item: Self) -> Self {
        Self::List(Box::new(item))
    }

    /// An object built from `(name, schema)` pairs.
    pub fn object<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Self)>,
        S: Into<String>,
    {
        Self::Object(
            fields
                .into_iter()
                .map(|(name, schema)| Field {
                    name: name.into(),
                    schema,
                })
                .collect(),
        )
    }

    /// Parses a JSON schema description, rejecting unknown kind tags.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the description is not a valid schema.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|error| Error::Config(format!("invalid extraction schema: {error}")))
    }
}
