//! Avro schema tree as consumed by the resolving reader.
//!
//! Schemas arrive already parsed; this module only models the node kinds and
//! the named-type table used to follow `Ref` nodes.

use std::collections::HashMap;

use crate::error::DecodeError;

/// Avro schema.
#[derive(Debug, Clone, PartialEq)]
pub enum AvroSchema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    /// Record (also used for Avro `error` types).
    Record {
        name: String,
        namespace: Option<String>,
        fields: Vec<AvroField>,
        aliases: Vec<String>,
        doc: Option<String>,
    },
    Enum {
        name: String,
        namespace: Option<String>,
        symbols: Vec<String>,
        default: Option<String>,
        aliases: Vec<String>,
    },
    Array {
        items: Box<AvroSchema>,
    },
    Map {
        values: Box<AvroSchema>,
    },
    Fixed {
        name: String,
        namespace: Option<String>,
        size: usize,
        aliases: Vec<String>,
    },
    Union(Vec<AvroSchema>),
    /// Reference to a named type declared elsewhere in the same tree.
    Ref(String),
}

impl AvroSchema {
    /// Returns the full name (namespace.name if both present).
    pub fn full_name(&self) -> Option<String> {
        match self {
            AvroSchema::Record {
                name, namespace, ..
            }
            | AvroSchema::Enum {
                name, namespace, ..
            }
            | AvroSchema::Fixed {
                name, namespace, ..
            } => Some(qualify(name, namespace.as_deref())),
            AvroSchema::Ref(name) => Some(name.clone()),
            _ => None,
        }
    }

    /// Short lowercase kind name, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            AvroSchema::Null => "null",
            AvroSchema::Boolean => "boolean",
            AvroSchema::Int => "int",
            AvroSchema::Long => "long",
            AvroSchema::Float => "float",
            AvroSchema::Double => "double",
            AvroSchema::Bytes => "bytes",
            AvroSchema::String => "string",
            AvroSchema::Record { .. } => "record",
            AvroSchema::Enum { .. } => "enum",
            AvroSchema::Array { .. } => "array",
            AvroSchema::Map { .. } => "map",
            AvroSchema::Fixed { .. } => "fixed",
            AvroSchema::Union(_) => "union",
            AvroSchema::Ref(_) => "ref",
        }
    }

    /// Human readable label: the full name for named types, the kind otherwise.
    pub fn label(&self) -> String {
        self.full_name().unwrap_or_else(|| self.kind().to_string())
    }

    /// If this is the two-branch `{null, T}` union (either order), returns `T`.
    pub fn nullable_branch(&self) -> Option<&AvroSchema> {
        match self {
            AvroSchema::Union(branches) if branches.len() == 2 => {
                match (&branches[0], &branches[1]) {
                    (AvroSchema::Null, AvroSchema::Null) => None,
                    (AvroSchema::Null, other) | (other, AvroSchema::Null) => Some(other),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Looks up a record field by name.
    pub fn field(&self, name: &str) -> Option<&AvroField> {
        match self {
            AvroSchema::Record { fields, .. } => fields.iter().find(|f| f.name == name),
            _ => None,
        }
    }
}

fn qualify(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() && !name.contains('.') => format!("{}.{}", ns, name),
        _ => name.to_string(),
    }
}

/// A field in an Avro record schema.
#[derive(Debug, Clone, PartialEq)]
pub struct AvroField {
    pub name: String,
    pub type_: AvroSchema,
    /// Default literal, interpreted against `type_`.
    pub default: Option<serde_json::Value>,
    pub doc: Option<String>,
    pub aliases: Vec<String>,
}

impl AvroField {
    pub fn new(name: impl Into<String>, type_: AvroSchema) -> Self {
        Self {
            name: name.into(),
            type_,
            default: None,
            doc: None,
            aliases: Vec::new(),
        }
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// True if a writer field called `name` feeds this field.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }
}

/// Named types declared in one schema tree, keyed by full name.
///
/// Writer and reader schemas each get their own table: the same name may
/// describe different shapes on either side.
#[derive(Debug, Default, Clone)]
pub struct Names<'s> {
    named: HashMap<String, &'s AvroSchema>,
}

impl<'s> Names<'s> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks `schema` and records every named type it declares.
    pub fn collect(schema: &'s AvroSchema) -> Self {
        let mut names = Self::new();
        names.add(schema);
        names
    }

    /// Adds the named types declared in `schema` to this table.
    pub fn add(&mut self, schema: &'s AvroSchema) {
        match schema {
            AvroSchema::Record { fields, .. } => {
                if let Some(name) = schema.full_name() {
                    self.named.insert(name, schema);
                }
                for f in fields {
                    self.add(&f.type_);
                }
            }
            AvroSchema::Enum { .. } | AvroSchema::Fixed { .. } => {
                if let Some(name) = schema.full_name() {
                    self.named.insert(name, schema);
                }
            }
            AvroSchema::Array { items } => self.add(items),
            AvroSchema::Map { values } => self.add(values),
            AvroSchema::Union(schemas) => {
                for s in schemas {
                    self.add(s);
                }
            }
            _ => {}
        }
    }

    pub fn get(&self, name: &str) -> Option<&'s AvroSchema> {
        self.named.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty()
    }

    /// Follows `Ref` nodes until a concrete schema is reached.
    pub fn resolve(&self, schema: &'s AvroSchema) -> Result<&'s AvroSchema, DecodeError> {
        let mut current = schema;
        // A chain longer than the table means a ref cycle.
        for _ in 0..=self.named.len() {
            match current {
                AvroSchema::Ref(name) => {
                    current = self.get(name).ok_or_else(|| {
                        DecodeError::UnsupportedSchema(format!("unresolved reference `{name}`"))
                    })?;
                }
                _ => return Ok(current),
            }
        }
        Err(DecodeError::UnsupportedSchema(format!(
            "cyclic reference `{}`",
            schema.label()
        )))
    }
}
