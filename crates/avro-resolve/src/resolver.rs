//! Schema node → runtime type resolution.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{DecoderConfig, MappingFamily, SequenceFamily};
use crate::error::DecodeError;
use crate::registry::{EnumBinding, RecordBinding, TypeRegistry};
use crate::schema::{AvroSchema, Names};
use crate::value::{Mapping, Sequence, Value};

/// Runtime type chosen to hold a value of one schema node.
#[derive(Debug, Clone)]
pub enum ResolvedType {
    /// `null`: no value.
    Unit,
    Boolean { nullable: bool },
    Int { nullable: bool },
    Long { nullable: bool },
    Float { nullable: bool },
    Double { nullable: bool },
    /// `bytes` and `fixed`.
    Bytes,
    Text,
    Enum {
        binding: Arc<EnumBinding>,
        nullable: bool,
    },
    Record(Arc<RecordBinding>),
    Sequence {
        family: SequenceFamily,
        item: Arc<ResolvedType>,
    },
    Mapping {
        family: MappingFamily,
        value: Arc<ResolvedType>,
    },
    /// A union other than `{null, T}`; values carry their branch index.
    Any,
}

impl ResolvedType {
    /// True for value kinds wrapped in their nullable form.
    pub fn is_nullable(&self) -> bool {
        match self {
            ResolvedType::Boolean { nullable }
            | ResolvedType::Int { nullable }
            | ResolvedType::Long { nullable }
            | ResolvedType::Float { nullable }
            | ResolvedType::Double { nullable }
            | ResolvedType::Enum { nullable, .. } => *nullable,
            _ => false,
        }
    }

    /// Empty container for `Sequence`/`Mapping`, `None` for every other kind.
    pub fn new_container(&self) -> Option<Value> {
        match self {
            ResolvedType::Sequence { family, .. } => Some(Value::Array(Sequence::new(*family))),
            ResolvedType::Mapping { family, .. } => Some(Value::Map(Mapping::new(*family))),
            _ => None,
        }
    }
}

/// Memoizing type resolver bound to one reader schema tree.
///
/// Memo entries are keyed by schema node address, so a resolver lives no
/// longer than the schemas it borrows; the decoder builds one per call.
pub struct TypeResolver<'a> {
    names: Names<'a>,
    registry: &'a TypeRegistry,
    config: &'a DecoderConfig,
    memo: HashMap<(usize, bool), Arc<ResolvedType>>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(names: Names<'a>, registry: &'a TypeRegistry, config: &'a DecoderConfig) -> Self {
        Self {
            names,
            registry,
            config,
            memo: HashMap::new(),
        }
    }

    /// Named types of the reader schema tree.
    pub fn names(&self) -> &Names<'a> {
        &self.names
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    pub fn config(&self) -> &'a DecoderConfig {
        self.config
    }

    /// Resolves `schema`; `nullable` marks the non-null branch of a `{null, T}` union.
    pub fn resolve(
        &mut self,
        schema: &'a AvroSchema,
        nullable: bool,
    ) -> Result<Arc<ResolvedType>, DecodeError> {
        let schema = self.names.resolve(schema)?;
        let key = (schema as *const AvroSchema as usize, nullable);
        if let Some(hit) = self.memo.get(&key) {
            return Ok(Arc::clone(hit));
        }
        let resolved = Arc::new(self.resolve_uncached(schema, nullable)?);
        self.memo.insert(key, Arc::clone(&resolved));
        Ok(resolved)
    }

    fn resolve_uncached(
        &mut self,
        schema: &'a AvroSchema,
        nullable: bool,
    ) -> Result<ResolvedType, DecodeError> {
        Ok(match schema {
            AvroSchema::Null => ResolvedType::Unit,
            AvroSchema::Boolean => ResolvedType::Boolean { nullable },
            AvroSchema::Int => ResolvedType::Int { nullable },
            AvroSchema::Long => ResolvedType::Long { nullable },
            AvroSchema::Float => ResolvedType::Float { nullable },
            AvroSchema::Double => ResolvedType::Double { nullable },
            AvroSchema::Bytes | AvroSchema::Fixed { .. } => ResolvedType::Bytes,
            AvroSchema::String => ResolvedType::Text,
            AvroSchema::Enum { .. } => {
                let name = schema.label();
                let binding = self
                    .registry
                    .lookup_enum(&name)
                    .ok_or(DecodeError::UnknownEnumType(name))?;
                ResolvedType::Enum {
                    binding: Arc::clone(binding),
                    nullable,
                }
            }
            AvroSchema::Record { .. } => {
                let name = schema.label();
                let binding = self
                    .registry
                    .lookup_record(&name)
                    .ok_or(DecodeError::UnknownRecordType(name))?;
                ResolvedType::Record(Arc::clone(binding))
            }
            AvroSchema::Array { items } => ResolvedType::Sequence {
                family: self.config.sequence_family,
                item: self.resolve(items, false)?,
            },
            AvroSchema::Map { values } => ResolvedType::Mapping {
                family: self.config.mapping_family,
                value: self.resolve(values, false)?,
            },
            AvroSchema::Union(_) => match schema.nullable_branch() {
                Some(inner) => {
                    if let AvroSchema::Union(_) = self.names.resolve(inner)? {
                        return Err(DecodeError::UnsupportedSchema(
                            "union nested directly in a union".to_string(),
                        ));
                    }
                    return self.resolve(inner, true).map(|t| t.as_ref().clone());
                }
                None => ResolvedType::Any,
            },
            AvroSchema::Ref(name) => {
                return Err(DecodeError::UnsupportedSchema(format!(
                    "unresolved reference `{name}`"
                )))
            }
        })
    }
}
