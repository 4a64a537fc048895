//! Decoded object graph.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

use indexmap::IndexMap;

use crate::config::{MappingFamily, SequenceFamily};

/// Runtime value produced by the resolving decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// `bytes` and `fixed` payloads.
    Bytes(Vec<u8>),
    Str(String),
    /// A registered native enum value.
    Enum(Object),
    Array(Sequence),
    Map(Mapping),
    /// A registered native record instance.
    Record(Object),
    /// A value of a union that is not the `{null, T}` shape.
    Union { index: usize, value: Box<Value> },
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::Str(_) => "string",
            Value::Enum(_) => "enum",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Union { .. } => "union",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ---------------------------------------------------------------- native objects

/// Object-safe view of a registered native type.
///
/// Implemented for every `Clone + PartialEq + Debug + Send + Sync + 'static`
/// type; callers never implement it by hand.
pub trait NativeObject: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_object(&self) -> Box<dyn NativeObject>;
    fn eq_object(&self, other: &dyn NativeObject) -> bool;
}

impl<T> NativeObject for T
where
    T: Any + fmt::Debug + Clone + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_object(&self) -> Box<dyn NativeObject> {
        Box::new(self.clone())
    }

    fn eq_object(&self, other: &dyn NativeObject) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
}

/// Type-erased native record or enum value.
pub struct Object {
    type_id: TypeId,
    type_name: &'static str,
    inner: Box<dyn NativeObject>,
}

impl Object {
    pub fn new<T: NativeObject>(value: T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            inner: Box::new(value),
        }
    }

    /// `TypeId` of the wrapped native type.
    pub fn native_type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name of the wrapped native type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.inner.as_any_mut().downcast_mut::<T>()
    }

    /// Takes the native value out, handing the object back on a type mismatch.
    pub fn downcast<T: Any + Clone>(self) -> Result<T, Object> {
        match self.downcast_ref::<T>() {
            Some(value) => Ok(value.clone()),
            None => Err(self),
        }
    }
}

impl Clone for Object {
    fn clone(&self) -> Self {
        Self {
            type_id: self.type_id,
            type_name: self.type_name,
            inner: self.inner.clone_object(),
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.inner.eq_object(other.inner.as_ref())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

// ---------------------------------------------------------------- containers

/// Ordered sequence backing decoded `array` values.
#[derive(Debug, Clone, PartialEq)]
pub enum Sequence {
    List(Vec<Value>),
    Deque(VecDeque<Value>),
}

impl Sequence {
    pub fn new(family: SequenceFamily) -> Self {
        match family {
            SequenceFamily::List => Sequence::List(Vec::new()),
            SequenceFamily::Deque => Sequence::Deque(VecDeque::new()),
        }
    }

    pub fn family(&self) -> SequenceFamily {
        match self {
            Sequence::List(_) => SequenceFamily::List,
            Sequence::Deque(_) => SequenceFamily::Deque,
        }
    }

    pub fn push(&mut self, value: Value) {
        match self {
            Sequence::List(items) => items.push(value),
            Sequence::Deque(items) => items.push_back(value),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Sequence::List(items) => items.clear(),
            Sequence::Deque(items) => items.clear(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Sequence::List(items) => items.len(),
            Sequence::Deque(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        match self {
            Sequence::List(items) => items.get(index),
            Sequence::Deque(items) => items.get(index),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            Sequence::List(items) => Box::new(items.iter()),
            Sequence::Deque(items) => Box::new(items.iter()),
        }
    }

    pub fn into_vec(self) -> Vec<Value> {
        match self {
            Sequence::List(items) => items,
            Sequence::Deque(items) => items.into(),
        }
    }
}

/// String-keyed mapping backing decoded `map` values.
#[derive(Debug, Clone, PartialEq)]
pub enum Mapping {
    /// Insertion order.
    Ordered(IndexMap<String, Value>),
    /// Key order.
    Sorted(BTreeMap<String, Value>),
    Hashed(HashMap<String, Value>),
}

impl Mapping {
    pub fn new(family: MappingFamily) -> Self {
        match family {
            MappingFamily::Ordered => Mapping::Ordered(IndexMap::new()),
            MappingFamily::Sorted => Mapping::Sorted(BTreeMap::new()),
            MappingFamily::Hashed => Mapping::Hashed(HashMap::new()),
        }
    }

    pub fn family(&self) -> MappingFamily {
        match self {
            Mapping::Ordered(_) => MappingFamily::Ordered,
            Mapping::Sorted(_) => MappingFamily::Sorted,
            Mapping::Hashed(_) => MappingFamily::Hashed,
        }
    }

    /// Inserts or overwrites `key`.
    pub fn insert(&mut self, key: String, value: Value) {
        match self {
            Mapping::Ordered(entries) => {
                entries.insert(key, value);
            }
            Mapping::Sorted(entries) => {
                entries.insert(key, value);
            }
            Mapping::Hashed(entries) => {
                entries.insert(key, value);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Mapping::Ordered(entries) => entries.get(key),
            Mapping::Sorted(entries) => entries.get(key),
            Mapping::Hashed(entries) => entries.get(key),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Mapping::Ordered(entries) => entries.clear(),
            Mapping::Sorted(entries) => entries.clear(),
            Mapping::Hashed(entries) => entries.clear(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Mapping::Ordered(entries) => entries.len(),
            Mapping::Sorted(entries) => entries.len(),
            Mapping::Hashed(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = (&String, &Value)> + '_> {
        match self {
            Mapping::Ordered(entries) => Box::new(entries.iter()),
            Mapping::Sorted(entries) => Box::new(entries.iter()),
            Mapping::Hashed(entries) => Box::new(entries.iter()),
        }
    }

    pub fn into_entries(self) -> Vec<(String, Value)> {
        match self {
            Mapping::Ordered(entries) => entries.into_iter().collect(),
            Mapping::Sorted(entries) => entries.into_iter().collect(),
            Mapping::Hashed(entries) => entries.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------- extraction

/// Conversion failure from [`Value`] into a native Rust type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("expected native type {expected}, found {found}")]
    NativeType {
        expected: &'static str,
        found: &'static str,
    },
}

impl ValueError {
    fn mismatch(expected: &'static str, found: &Value) -> Self {
        ValueError::Mismatch {
            expected,
            found: found.kind(),
        }
    }
}

/// Conversion from a decoded [`Value`] into a native Rust type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(()),
            other => Err(ValueError::mismatch("null", &other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(ValueError::mismatch("boolean", &other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Int(n) => Ok(n),
            other => Err(ValueError::mismatch("int", &other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Long(n) => Ok(n),
            Value::Int(n) => Ok(n.into()),
            other => Err(ValueError::mismatch("long", &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(n) => Ok(n),
            other => Err(ValueError::mismatch("float", &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Double(n) => Ok(n),
            Value::Float(n) => Ok(n.into()),
            other => Err(ValueError::mismatch("double", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(ValueError::mismatch("string", &other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bytes(b) => Ok(b),
            other => Err(ValueError::mismatch("bytes", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Array(seq) => seq.into_vec().into_iter().map(T::from_value).collect(),
            other => Err(ValueError::mismatch("array", &other)),
        }
    }
}

impl<T: FromValue> FromValue for VecDeque<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Array(seq) => seq.into_vec().into_iter().map(T::from_value).collect(),
            other => Err(ValueError::mismatch("array", &other)),
        }
    }
}

fn map_entries<T: FromValue>(value: Value) -> Result<Vec<(String, T)>, ValueError> {
    match value {
        Value::Map(map) => map
            .into_entries()
            .into_iter()
            .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
            .collect(),
        other => Err(ValueError::mismatch("map", &other)),
    }
}

impl<T: FromValue> FromValue for IndexMap<String, T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(map_entries(value)?.into_iter().collect())
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(map_entries(value)?.into_iter().collect())
    }
}

impl<T: FromValue> FromValue for HashMap<String, T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(map_entries(value)?.into_iter().collect())
    }
}

impl FromValue for Object {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Record(obj) | Value::Enum(obj) => Ok(obj),
            other => Err(ValueError::mismatch("record or enum", &other)),
        }
    }
}

/// Extracts a registered native record or enum type from a [`Value`].
#[derive(Debug, Clone, PartialEq)]
pub struct Native<T>(pub T);

impl<T> Native<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Any + Clone> FromValue for Native<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        let obj = Object::from_value(value)?;
        obj.downcast::<T>()
            .map(Native)
            .map_err(|obj| ValueError::NativeType {
                expected: std::any::type_name::<T>(),
                found: obj.type_name(),
            })
    }
}
