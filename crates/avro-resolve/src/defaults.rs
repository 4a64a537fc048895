//! Materializes reader-schema default literals into runtime values.

use serde_json::Value as Literal;

use crate::error::{DecodeError, DefaultValueError};
use crate::resolver::{ResolvedType, TypeResolver};
use crate::schema::AvroSchema;
use crate::value::Value;

/// Turns default literals into [`Value`]s shaped by the reader schema.
pub struct DefaultMaterializer<'r, 'a> {
    resolver: &'r mut TypeResolver<'a>,
}

impl<'r, 'a> DefaultMaterializer<'r, 'a> {
    pub fn new(resolver: &'r mut TypeResolver<'a>) -> Self {
        Self { resolver }
    }

    /// Materializes `literal` against `schema`; an absent literal is "no value".
    pub fn materialize(
        &mut self,
        schema: &'a AvroSchema,
        literal: Option<&Literal>,
    ) -> Result<Value, DecodeError> {
        match literal {
            None => Ok(Value::Null),
            Some(literal) => self.value_at(schema, literal, &schema.label()),
        }
    }

    /// Materializes the declared default of `record.field`.
    pub fn materialize_field(
        &mut self,
        record: &str,
        field: &'a crate::schema::AvroField,
    ) -> Result<Value, DecodeError> {
        let path = format!("{record}.{}", field.name);
        let literal = field.default.as_ref().ok_or_else(|| {
            DefaultValueError::new(&path, "field is absent from the writer and has no default")
        })?;
        self.value_at(&field.type_, literal, &path)
    }

    fn value_at(
        &mut self,
        schema: &'a AvroSchema,
        literal: &Literal,
        path: &str,
    ) -> Result<Value, DecodeError> {
        let schema = self.resolver.names().resolve(schema)?;
        let mismatch = |expected: &str| {
            DefaultValueError::new(path, format!("expected {expected}, found {}", shape(literal)))
        };
        match schema {
            AvroSchema::Null => match literal {
                Literal::Null => Ok(Value::Null),
                _ => Err(mismatch("null literal").into()),
            },
            AvroSchema::Boolean => literal
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| mismatch("boolean literal").into()),
            AvroSchema::Int => {
                let n = literal
                    .as_i64()
                    .ok_or_else(|| mismatch("integral literal"))?;
                i32::try_from(n).map(Value::Int).map_err(|_| {
                    DefaultValueError::new(path, format!("integral literal {n} out of int range"))
                        .into()
                })
            }
            AvroSchema::Long => literal
                .as_i64()
                .map(Value::Long)
                .ok_or_else(|| mismatch("integral literal").into()),
            AvroSchema::Float => {
                let n = match literal {
                    Literal::Number(n) if n.is_f64() => n.as_f64(),
                    _ => None,
                }
                .ok_or_else(|| mismatch("numeric literal"))?;
                let narrowed = n as f32;
                if !narrowed.is_finite() {
                    return Err(DefaultValueError::new(
                        path,
                        format!("numeric literal {n} out of float range"),
                    )
                    .into());
                }
                Ok(Value::Float(narrowed))
            }
            AvroSchema::Double => literal
                .as_f64()
                .map(Value::Double)
                .ok_or_else(|| mismatch("numeric or integral literal").into()),
            AvroSchema::String => literal
                .as_str()
                .map(|s| Value::Str(s.to_string()))
                .ok_or_else(|| mismatch("text literal").into()),
            AvroSchema::Bytes => {
                let text = literal.as_str().ok_or_else(|| mismatch("text literal"))?;
                Ok(Value::Bytes(latin1_bytes(text, path)?))
            }
            AvroSchema::Fixed { size, .. } => {
                let text = literal.as_str().ok_or_else(|| mismatch("text literal"))?;
                let bytes = latin1_bytes(text, path)?;
                if bytes.len() != *size {
                    return Err(DefaultValueError::new(
                        path,
                        format!("fixed size is {size}, literal has {} bytes", bytes.len()),
                    )
                    .into());
                }
                Ok(Value::Bytes(bytes))
            }
            AvroSchema::Enum { symbols, .. } => {
                let symbol = literal.as_str().ok_or_else(|| mismatch("text literal"))?;
                if !symbols.iter().any(|s| s == symbol) {
                    return Err(DefaultValueError::new(
                        path,
                        format!("`{symbol}` is not a symbol of enum `{}`", schema.label()),
                    )
                    .into());
                }
                match self.resolver.resolve(schema, false)?.as_ref() {
                    ResolvedType::Enum { binding, .. } => Ok(Value::Enum(binding.parse(symbol)?)),
                    _ => Err(DecodeError::UnknownEnumType(schema.label())),
                }
            }
            AvroSchema::Array { items } => {
                let elements = literal.as_array().ok_or_else(|| mismatch("list literal"))?;
                let mut container = self.empty_container(schema)?;
                if let Value::Array(seq) = &mut container {
                    for (i, element) in elements.iter().enumerate() {
                        seq.push(self.value_at(items, element, &format!("{path}[{i}]"))?);
                    }
                }
                Ok(container)
            }
            AvroSchema::Map { values } => {
                let entries = literal.as_object().ok_or_else(|| mismatch("object literal"))?;
                let mut container = self.empty_container(schema)?;
                if let Value::Map(map) = &mut container {
                    for (key, entry) in entries {
                        let value = self.value_at(values, entry, &format!("{path}.{key}"))?;
                        map.insert(key.clone(), value);
                    }
                }
                Ok(container)
            }
            AvroSchema::Record { fields, .. } => {
                let entries = literal.as_object().ok_or_else(|| mismatch("object literal"))?;
                let binding = match self.resolver.resolve(schema, false)?.as_ref() {
                    ResolvedType::Record(binding) => binding.clone(),
                    _ => return Err(DecodeError::UnknownRecordType(schema.label())),
                };
                let mut instance = self.resolver.config().instance_factory.create(&binding)?;
                for field in fields {
                    let field_path = format!("{path}.{}", field.name);
                    let field_literal = entries
                        .get(&field.name)
                        .or(field.default.as_ref())
                        .ok_or_else(|| {
                            DefaultValueError::new(&field_path, "no literal entry and no field default")
                        })?;
                    let value = self.value_at(&field.type_, field_literal, &field_path)?;
                    binding.set_field(&mut instance, &field.name, value)?;
                }
                Ok(Value::Record(instance))
            }
            AvroSchema::Union(branches) => {
                let first = branches.first().ok_or_else(|| {
                    DefaultValueError::new(path, "union has no branches")
                })?;
                let value = self.value_at(first, literal, path)?;
                if schema.nullable_branch().is_some() {
                    Ok(value)
                } else {
                    Ok(Value::Union {
                        index: 0,
                        value: Box::new(value),
                    })
                }
            }
            AvroSchema::Ref(name) => Err(DecodeError::UnsupportedSchema(format!(
                "unresolved reference `{name}`"
            ))),
        }
    }

    fn empty_container(&mut self, schema: &'a AvroSchema) -> Result<Value, DecodeError> {
        self.resolver
            .resolve(schema, false)?
            .new_container()
            .ok_or_else(|| DecodeError::UnsupportedSchema(schema.label()))
    }
}

/// One byte per character: code points 0..=255 map to themselves.
fn latin1_bytes(text: &str, path: &str) -> Result<Vec<u8>, DefaultValueError> {
    text.chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| {
                DefaultValueError::new(
                    path,
                    format!("character U+{:04X} does not fit in a byte", u32::from(c)),
                )
            })
        })
        .collect()
}

fn shape(literal: &Literal) -> &'static str {
    match literal {
        Literal::Null => "null",
        Literal::Bool(_) => "boolean",
        Literal::Number(n) if n.is_f64() => "non-integral number",
        Literal::Number(_) => "integral number",
        Literal::String(_) => "text",
        Literal::Array(_) => "list",
        Literal::Object(_) => "object",
    }
}
