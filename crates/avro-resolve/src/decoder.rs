//! Schema-resolving Avro decoder.
//!
//! The writer schema decides which bytes are on the wire; the reader schema
//! decides the shape of the produced values. Record fields are matched by
//! name, writer-only fields are skipped, reader-only fields are filled from
//! their defaults.

use std::sync::Arc;

use crate::config::DecoderConfig;
use crate::cursor::{AvroCursor, Cursor, CursorError};
use crate::defaults::DefaultMaterializer;
use crate::error::DecodeError;
use crate::registry::TypeRegistry;
use crate::resolver::{ResolvedType, TypeResolver};
use crate::schema::{AvroField, AvroSchema, Names};
use crate::value::{FromValue, Value};

/// Reads Avro data written under one schema into values shaped by another.
///
/// Holds only immutable state, so one decoder can serve concurrent reads over
/// independent cursors.
#[derive(Debug, Clone)]
pub struct ResolvingDecoder {
    registry: Arc<TypeRegistry>,
    config: DecoderConfig,
}

impl ResolvingDecoder {
    pub fn new(registry: impl Into<Arc<TypeRegistry>>) -> Self {
        Self::with_config(registry, DecoderConfig::default())
    }

    pub fn with_config(registry: impl Into<Arc<TypeRegistry>>, config: DecoderConfig) -> Self {
        Self {
            registry: registry.into(),
            config,
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Reads one value from `cursor`.
    ///
    /// `reuse` may hold a record, array or map from an earlier call; it is
    /// refilled in place when its shape fits the reader schema and replaced
    /// otherwise.
    pub fn read<C: Cursor + ?Sized>(
        &self,
        reuse: Option<Value>,
        writer: &AvroSchema,
        reader: &AvroSchema,
        cursor: &mut C,
    ) -> Result<Value, DecodeError> {
        tracing::trace!(writer = %writer.label(), reader = %reader.label(), "resolving read");
        let mut ctx = ReadContext {
            writer_names: Names::collect(writer),
            resolver: TypeResolver::new(Names::collect(reader), &self.registry, &self.config),
        };
        ctx.read(reuse, writer, reader, cursor)
    }

    /// Decodes a single value from `data`.
    pub fn decode(
        &self,
        data: &[u8],
        writer: &AvroSchema,
        reader: &AvroSchema,
    ) -> Result<Value, DecodeError> {
        let mut cursor = AvroCursor::new(data);
        self.read(None, writer, reader, &mut cursor)
    }

    /// Decodes a single value from `data` and converts it to `T`.
    pub fn decode_as<T: FromValue>(
        &self,
        data: &[u8],
        writer: &AvroSchema,
        reader: &AvroSchema,
    ) -> Result<T, DecodeError> {
        Ok(T::from_value(self.decode(data, writer, reader)?)?)
    }

    /// Resolves the runtime type of `schema`, a self-contained schema tree.
    pub fn resolve_type(
        &self,
        schema: &AvroSchema,
        nullable: bool,
    ) -> Result<Arc<ResolvedType>, DecodeError> {
        TypeResolver::new(Names::collect(schema), &self.registry, &self.config)
            .resolve(schema, nullable)
    }

    /// Materializes a default literal against `schema`.
    pub fn materialize_default(
        &self,
        schema: &AvroSchema,
        literal: Option<&serde_json::Value>,
    ) -> Result<Value, DecodeError> {
        let mut resolver = TypeResolver::new(Names::collect(schema), &self.registry, &self.config);
        DefaultMaterializer::new(&mut resolver).materialize(schema, literal)
    }
}

/// State of one `read` call.
struct ReadContext<'a> {
    writer_names: Names<'a>,
    resolver: TypeResolver<'a>,
}

impl<'a> ReadContext<'a> {
    fn read<C: Cursor + ?Sized>(
        &mut self,
        reuse: Option<Value>,
        writer: &'a AvroSchema,
        reader: &'a AvroSchema,
        cursor: &mut C,
    ) -> Result<Value, DecodeError> {
        let writer = self.writer_names.resolve(writer)?;
        let reader = self.resolver.names().resolve(reader)?;

        if let AvroSchema::Union(branches) = writer {
            return self.read_union(reuse, branches, reader, cursor);
        }
        if let AvroSchema::Union(branches) = reader {
            return match reader.nullable_branch() {
                Some(inner) => self.read(reuse, writer, inner, cursor),
                None => {
                    let index = self.match_branch(writer, branches)?;
                    let value = self.read(None, writer, &branches[index], cursor)?;
                    Ok(Value::Union {
                        index,
                        value: Box::new(value),
                    })
                }
            };
        }

        if !leaf_compatible(writer, reader) {
            return Err(DecodeError::incompatible(writer, reader));
        }

        match writer {
            AvroSchema::Null => {
                cursor.read_null()?;
                Ok(Value::Null)
            }
            AvroSchema::Boolean => Ok(Value::Bool(cursor.read_boolean()?)),
            AvroSchema::Int => {
                let n = cursor.read_int()?;
                Ok(match reader {
                    AvroSchema::Long => Value::Long(n.into()),
                    AvroSchema::Float => Value::Float(n as f32),
                    AvroSchema::Double => Value::Double(n.into()),
                    _ => Value::Int(n),
                })
            }
            AvroSchema::Long => {
                let n = cursor.read_long()?;
                Ok(match reader {
                    AvroSchema::Float => Value::Float(n as f32),
                    AvroSchema::Double => Value::Double(n as f64),
                    _ => Value::Long(n),
                })
            }
            AvroSchema::Float => {
                let n = cursor.read_float()?;
                Ok(match reader {
                    AvroSchema::Double => Value::Double(n.into()),
                    _ => Value::Float(n),
                })
            }
            AvroSchema::Double => Ok(Value::Double(cursor.read_double()?)),
            AvroSchema::String => {
                let s = cursor.read_string()?;
                Ok(match reader {
                    AvroSchema::Bytes => Value::Bytes(s.into_bytes()),
                    _ => Value::Str(s),
                })
            }
            AvroSchema::Bytes => {
                let mut buf = Vec::new();
                cursor.read_bytes_into(&mut buf)?;
                match reader {
                    AvroSchema::String => String::from_utf8(buf)
                        .map(Value::Str)
                        .map_err(|_| DecodeError::from(CursorError::InvalidUtf8)),
                    _ => Ok(Value::Bytes(buf)),
                }
            }
            AvroSchema::Fixed { size, .. } => {
                if let AvroSchema::Fixed {
                    size: reader_size, ..
                } = reader
                {
                    if reader_size != size {
                        return Err(DecodeError::SizeMismatch {
                            name: reader.label(),
                            writer: *size,
                            reader: *reader_size,
                        });
                    }
                }
                let mut buf = vec![0u8; *size];
                cursor.read_fixed_into(&mut buf)?;
                Ok(Value::Bytes(buf))
            }
            AvroSchema::Enum { symbols, .. } => {
                let ordinal = cursor.read_enum_ordinal()?;
                let symbol = symbols.get(ordinal).ok_or_else(|| DecodeError::EnumOrdinal {
                    name: writer.label(),
                    ordinal,
                })?;
                self.enum_value(symbol, writer, reader)
            }
            AvroSchema::Array { items } => {
                let AvroSchema::Array {
                    items: reader_items,
                } = reader
                else {
                    return Err(DecodeError::incompatible(writer, reader));
                };
                let mut seq = match reuse {
                    Some(Value::Array(mut seq)) => {
                        seq.clear();
                        seq
                    }
                    _ => match self.resolver.resolve(reader, false)?.new_container() {
                        Some(Value::Array(seq)) => seq,
                        _ => return Err(DecodeError::incompatible(writer, reader)),
                    },
                };
                loop {
                    let count = cursor.read_array_block_length()?;
                    if count == 0 {
                        break;
                    }
                    for _ in 0..count {
                        seq.push(self.read(None, items, reader_items, cursor)?);
                    }
                }
                Ok(Value::Array(seq))
            }
            AvroSchema::Map { values } => {
                let AvroSchema::Map {
                    values: reader_values,
                } = reader
                else {
                    return Err(DecodeError::incompatible(writer, reader));
                };
                let mut map = match reuse {
                    Some(Value::Map(mut map)) => {
                        map.clear();
                        map
                    }
                    _ => match self.resolver.resolve(reader, false)?.new_container() {
                        Some(Value::Map(map)) => map,
                        _ => return Err(DecodeError::incompatible(writer, reader)),
                    },
                };
                loop {
                    let count = cursor.read_map_block_length()?;
                    if count == 0 {
                        break;
                    }
                    for _ in 0..count {
                        let key = cursor.read_string()?;
                        let value = self.read(None, values, reader_values, cursor)?;
                        map.insert(key, value);
                    }
                }
                Ok(Value::Map(map))
            }
            AvroSchema::Record {
                fields: writer_fields,
                ..
            } => {
                let AvroSchema::Record {
                    fields: reader_fields,
                    ..
                } = reader
                else {
                    return Err(DecodeError::incompatible(writer, reader));
                };
                self.read_record(reuse, writer_fields, reader, reader_fields, cursor)
            }
            AvroSchema::Union(_) | AvroSchema::Ref(_) => {
                Err(DecodeError::UnsupportedSchema(writer.label()))
            }
        }
    }

    fn read_union<C: Cursor + ?Sized>(
        &mut self,
        reuse: Option<Value>,
        branches: &'a [AvroSchema],
        reader: &'a AvroSchema,
        cursor: &mut C,
    ) -> Result<Value, DecodeError> {
        let index = cursor.read_union_index()?;
        let branch = branches.get(index).ok_or(DecodeError::UnionIndex {
            index,
            branches: branches.len(),
        })?;
        let branch = self.writer_names.resolve(branch)?;

        let AvroSchema::Union(reader_branches) = reader else {
            return self.read(reuse, branch, reader, cursor);
        };
        match reader.nullable_branch() {
            Some(_) if matches!(branch, AvroSchema::Null) => Ok(Value::Null),
            Some(inner) => self.read(reuse, branch, inner, cursor),
            None => {
                let reader_index = self.match_branch(branch, reader_branches)?;
                let value = self.read(None, branch, &reader_branches[reader_index], cursor)?;
                Ok(Value::Union {
                    index: reader_index,
                    value: Box::new(value),
                })
            }
        }
    }

    fn read_record<C: Cursor + ?Sized>(
        &mut self,
        reuse: Option<Value>,
        writer_fields: &'a [AvroField],
        reader: &'a AvroSchema,
        reader_fields: &'a [AvroField],
        cursor: &mut C,
    ) -> Result<Value, DecodeError> {
        let record = reader.label();
        let binding = match self.resolver.resolve(reader, false)?.as_ref() {
            ResolvedType::Record(binding) => Arc::clone(binding),
            _ => return Err(DecodeError::UnknownRecordType(record)),
        };
        let (mut instance, reused) = match reuse {
            Some(Value::Record(obj)) if binding.accepts(&obj) => (obj, true),
            _ => (self.resolver.config().instance_factory.create(&binding)?, false),
        };

        // Wire order is the writer's field order.
        for wf in writer_fields {
            match reader_fields.iter().find(|rf| rf.answers_to(&wf.name)) {
                Some(rf) => {
                    let current = if reused {
                        binding.get_field(&instance, &rf.name)
                    } else {
                        None
                    };
                    let value = self
                        .read(current, &wf.type_, &rf.type_, cursor)
                        .map_err(|e| e.in_field(&record, &wf.name))?;
                    binding
                        .set_field(&mut instance, &rf.name, value)
                        .map_err(|e| e.in_field(&record, &wf.name))?;
                }
                None => {
                    tracing::trace!(record = %record, field = %wf.name, "skipping writer-only field");
                    cursor
                        .skip(&wf.type_, &self.writer_names)
                        .map_err(|e| DecodeError::from(e).in_field(&record, &wf.name))?;
                }
            }
        }

        for rf in reader_fields {
            if writer_fields.iter().any(|wf| rf.answers_to(&wf.name)) {
                continue;
            }
            tracing::debug!(record = %record, field = %rf.name, "filling reader-only field from default");
            let value = DefaultMaterializer::new(&mut self.resolver).materialize_field(&record, rf)?;
            binding.set_field(&mut instance, &rf.name, value)?;
        }

        Ok(Value::Record(instance))
    }

    fn enum_value(
        &mut self,
        symbol: &str,
        writer: &'a AvroSchema,
        reader: &'a AvroSchema,
    ) -> Result<Value, DecodeError> {
        match reader {
            AvroSchema::String => Ok(Value::Str(symbol.to_string())),
            AvroSchema::Enum {
                symbols, default, ..
            } => {
                let symbol = match default {
                    Some(fallback) if !symbols.iter().any(|s| s == symbol) => fallback.as_str(),
                    _ => symbol,
                };
                match self.resolver.resolve(reader, false)?.as_ref() {
                    ResolvedType::Enum { binding, .. } => Ok(Value::Enum(binding.parse(symbol)?)),
                    _ => Err(DecodeError::UnknownEnumType(reader.label())),
                }
            }
            _ => Err(DecodeError::incompatible(writer, reader)),
        }
    }

    /// Index of the reader branch that takes a value of `writer`: an exact
    /// match first, then a promotable one.
    fn match_branch(
        &self,
        writer: &AvroSchema,
        branches: &'a [AvroSchema],
    ) -> Result<usize, DecodeError> {
        let names = self.resolver.names();
        let resolved = branches
            .iter()
            .map(|b| names.resolve(b))
            .collect::<Result<Vec<_>, _>>()?;
        resolved
            .iter()
            .position(|r| same_type(writer, r))
            .or_else(|| resolved.iter().position(|r| promotable(writer, r)))
            .ok_or_else(|| DecodeError::NoMatchingBranch {
                writer: writer.label(),
            })
    }
}

fn same_type(writer: &AvroSchema, reader: &AvroSchema) -> bool {
    match (writer, reader) {
        (AvroSchema::Record { .. }, AvroSchema::Record { .. })
        | (AvroSchema::Enum { .. }, AvroSchema::Enum { .. })
        | (AvroSchema::Fixed { .. }, AvroSchema::Fixed { .. }) => {
            match (writer.full_name(), reader.full_name()) {
                (Some(w), Some(r)) => w == r || w.rsplit('.').next() == r.rsplit('.').next(),
                _ => false,
            }
        }
        _ => writer.kind() == reader.kind(),
    }
}

/// False when a primitive or fixed writer cannot feed `reader`. Writer
/// `null` is read as "no value" under any reader.
fn leaf_compatible(writer: &AvroSchema, reader: &AvroSchema) -> bool {
    match writer {
        AvroSchema::Null
        | AvroSchema::Enum { .. }
        | AvroSchema::Array { .. }
        | AvroSchema::Map { .. }
        | AvroSchema::Record { .. }
        | AvroSchema::Union(_)
        | AvroSchema::Ref(_) => true,
        AvroSchema::Fixed { .. } => matches!(reader, AvroSchema::Fixed { .. }),
        _ => writer.kind() == reader.kind() || promotable(writer, reader),
    }
}

fn promotable(writer: &AvroSchema, reader: &AvroSchema) -> bool {
    matches!(
        (writer, reader),
        (
            AvroSchema::Int,
            AvroSchema::Long | AvroSchema::Float | AvroSchema::Double
        ) | (AvroSchema::Long, AvroSchema::Float | AvroSchema::Double)
            | (AvroSchema::Float, AvroSchema::Double)
            | (AvroSchema::String, AvroSchema::Bytes)
            | (AvroSchema::Bytes, AvroSchema::String)
    )
}
