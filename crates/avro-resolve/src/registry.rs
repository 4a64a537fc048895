//! Named-type registry: native record and enum bindings keyed by Avro full name.
//!
//! Bindings are explicit closures registered once through
//! [`TypeRegistryBuilder`]; decoding only ever calls them, it never inspects
//! native types.
//!
//! ```
//! use avro_resolve::{EnumBinding, RecordBinding, TypeRegistry};
//!
//! #[derive(Debug, Clone, PartialEq, Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! let registry = TypeRegistry::builder()
//!     .record(
//!         RecordBinding::builder::<User>("app.User")
//!             .constructor(User::default)
//!             .field("id", |u: &mut User, v: i64| u.id = v)
//!             .field("name", |u: &mut User, v: String| u.name = v)
//!             .build(),
//!     )
//!     .build();
//! assert!(registry.lookup_record("app.User").is_some());
//! assert!(registry.lookup_enum("app.Role").is_none());
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::DecodeError;
use crate::value::{FromValue, NativeObject, Object, Value, ValueError};

type Constructor = Arc<dyn Fn() -> Object + Send + Sync>;
type Getter = Arc<dyn Fn(&Object) -> Option<Value> + Send + Sync>;
type Setter = Arc<dyn Fn(&mut Object, Value) -> Result<(), ValueError> + Send + Sync>;
type Parser = Arc<dyn Fn(&str) -> Result<Object, BoxError> + Send + Sync>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ---------------------------------------------------------------- records

#[derive(Clone)]
struct FieldAccessor {
    getter: Option<Getter>,
    setter: Setter,
}

/// Native record type bound to an Avro record full name.
pub struct RecordBinding {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    constructor: Option<Constructor>,
    fields: HashMap<String, FieldAccessor>,
}

impl RecordBinding {
    pub fn builder<T: NativeObject>(full_name: impl Into<String>) -> RecordBindingBuilder<T> {
        RecordBindingBuilder {
            binding: RecordBinding {
                name: full_name.into(),
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                constructor: None,
                fields: HashMap::new(),
            },
            _marker: PhantomData,
        }
    }

    /// Avro full name this binding answers to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type name of the bound native type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// True if `obj` holds this binding's native type.
    pub fn accepts(&self, obj: &Object) -> bool {
        obj.native_type_id() == self.type_id
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Runs the registered no-argument constructor, if any.
    pub fn construct(&self) -> Option<Object> {
        self.constructor.as_ref().map(|ctor| ctor())
    }

    /// Reads the current value of `field`, if a getter was registered.
    pub fn get_field(&self, obj: &Object, field: &str) -> Option<Value> {
        let getter = self.fields.get(field)?.getter.as_ref()?;
        getter(obj)
    }

    pub fn set_field(&self, obj: &mut Object, field: &str, value: Value) -> Result<(), DecodeError> {
        let accessor = self
            .fields
            .get(field)
            .ok_or_else(|| DecodeError::UnknownField {
                record: self.name.clone(),
                field: field.to_string(),
            })?;
        (accessor.setter)(obj, value).map_err(|source| DecodeError::FieldAccess {
            record: self.name.clone(),
            field: field.to_string(),
            source,
        })
    }
}

impl fmt::Debug for RecordBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        fields.sort_unstable();
        f.debug_struct("RecordBinding")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("constructor", &self.constructor.is_some())
            .field("fields", &fields)
            .finish()
    }
}

/// Typed builder for [`RecordBinding`].
pub struct RecordBindingBuilder<T> {
    binding: RecordBinding,
    _marker: PhantomData<fn() -> T>,
}

impl<T: NativeObject> RecordBindingBuilder<T> {
    /// Registers the no-argument constructor used by [`ConstructorFactory`].
    pub fn constructor<F>(mut self, ctor: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.binding.constructor = Some(Arc::new(move || Object::new(ctor())));
        self
    }

    /// Registers a write-only field.
    pub fn field<V, S>(self, name: &str, set: S) -> Self
    where
        V: FromValue,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.accessor(name, None, set)
    }

    /// Registers a field whose current value can be read back, which lets a
    /// reused record hand its nested containers to the decoder.
    pub fn field_with_getter<V, G, S>(self, name: &str, get: G, set: S) -> Self
    where
        V: FromValue,
        G: Fn(&T) -> Value + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let getter: Getter = Arc::new(move |obj: &Object| obj.downcast_ref::<T>().map(&get));
        self.accessor(name, Some(getter), set)
    }

    fn accessor<V, S>(mut self, name: &str, getter: Option<Getter>, set: S) -> Self
    where
        V: FromValue,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let setter: Setter = Arc::new(move |obj: &mut Object, value: Value| {
            let found = obj.type_name();
            let target = obj
                .downcast_mut::<T>()
                .ok_or(ValueError::NativeType {
                    expected: std::any::type_name::<T>(),
                    found,
                })?;
            set(target, V::from_value(value)?);
            Ok(())
        });
        self.binding
            .fields
            .insert(name.to_string(), FieldAccessor { getter, setter });
        self
    }

    pub fn build(self) -> RecordBinding {
        self.binding
    }
}

// ---------------------------------------------------------------- enums

/// Native enum type bound to an Avro enum full name.
pub struct EnumBinding {
    name: String,
    type_name: &'static str,
    parser: Parser,
}

impl EnumBinding {
    /// Binds `T`, parsing symbols with its [`FromStr`] implementation.
    pub fn new<T>(full_name: impl Into<String>) -> Self
    where
        T: FromStr + NativeObject,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        Self::with_parser(full_name, |symbol: &str| symbol.parse::<T>())
    }

    /// Binds `T` with a custom symbol parser.
    pub fn with_parser<T, E, F>(full_name: impl Into<String>, parse: F) -> Self
    where
        T: NativeObject,
        E: std::error::Error + Send + Sync + 'static,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            name: full_name.into(),
            type_name: std::any::type_name::<T>(),
            parser: Arc::new(move |symbol: &str| {
                parse(symbol).map(Object::new).map_err(|e| Box::new(e) as BoxError)
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Parses `symbol` into the native enum.
    pub fn parse(&self, symbol: &str) -> Result<Object, DecodeError> {
        (self.parser)(symbol).map_err(|source| DecodeError::EnumParse {
            type_name: self.name.clone(),
            symbol: symbol.to_string(),
            source,
        })
    }
}

impl fmt::Debug for EnumBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumBinding")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------- registry

/// Immutable table of native bindings, shared by every decode call.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    records: HashMap<String, Arc<RecordBinding>>,
    enums: HashMap<String, Arc<EnumBinding>>,
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    pub fn lookup_record(&self, full_name: &str) -> Option<&Arc<RecordBinding>> {
        self.records.get(full_name)
    }

    pub fn lookup_enum(&self, full_name: &str) -> Option<&Arc<EnumBinding>> {
        self.enums.get(full_name)
    }

    pub fn len(&self) -> usize {
        self.records.len() + self.enums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One-time construction step for [`TypeRegistry`].
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    registry: TypeRegistry,
}

impl TypeRegistryBuilder {
    pub fn record(mut self, binding: RecordBinding) -> Self {
        let name = binding.name.clone();
        if let Some(old) = self.registry.records.insert(name, Arc::new(binding)) {
            tracing::warn!(record = %old.name, "record binding replaced");
        }
        self
    }

    pub fn enumeration(mut self, binding: EnumBinding) -> Self {
        let name = binding.name.clone();
        if let Some(old) = self.registry.enums.insert(name, Arc::new(binding)) {
            tracing::warn!(enumeration = %old.name, "enum binding replaced");
        }
        self
    }

    pub fn build(self) -> TypeRegistry {
        self.registry
    }
}

// ---------------------------------------------------------------- factories

/// Allocates record instances for the decoder and default materializer.
pub trait InstanceFactory: Send + Sync {
    fn create(&self, binding: &RecordBinding) -> Result<Object, DecodeError>;
}

/// Default factory: calls the binding's registered constructor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstructorFactory;

impl InstanceFactory for ConstructorFactory {
    fn create(&self, binding: &RecordBinding) -> Result<Object, DecodeError> {
        binding
            .construct()
            .ok_or_else(|| DecodeError::NoConstructor(binding.name.clone()))
    }
}

impl<F> InstanceFactory for F
where
    F: Fn(&RecordBinding) -> Result<Object, DecodeError> + Send + Sync,
{
    fn create(&self, binding: &RecordBinding) -> Result<Object, DecodeError> {
        self(binding)
    }
}
