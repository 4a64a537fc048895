//! Schema-resolving Apache Avro reader.
//!
//! Decodes Avro binary data written under a *writer* schema into native Rust
//! values described by a *reader* schema, applying Avro schema resolution:
//! fields are matched by name (or alias), writer-only fields are skipped,
//! reader-only fields take their declared defaults, `{null, T}` unions map to
//! optional values and numeric types are promoted.
//!
//! Native record and enum types are bound once in a [`TypeRegistry`]; the
//! decoder calls the registered constructors and field setters and never
//! inspects types at runtime.
//!
//! ```
//! use avro_resolve::{AvroField, AvroSchema, Native, RecordBinding, ResolvingDecoder, TypeRegistry};
//! use serde_json::json;
//!
//! #[derive(Debug, Clone, PartialEq, Default)]
//! struct User {
//!     id: i32,
//!     name: String,
//! }
//!
//! let registry = TypeRegistry::builder()
//!     .record(
//!         RecordBinding::builder::<User>("User")
//!             .constructor(User::default)
//!             .field("id", |u: &mut User, v: i32| u.id = v)
//!             .field("name", |u: &mut User, v: String| u.name = v)
//!             .build(),
//!     )
//!     .build();
//!
//! let record = |fields| AvroSchema::Record {
//!     name: "User".to_string(),
//!     namespace: None,
//!     fields,
//!     aliases: Vec::new(),
//!     doc: None,
//! };
//! let writer = record(vec![AvroField::new("id", AvroSchema::Int)]);
//! let reader = record(vec![
//!     AvroField::new("id", AvroSchema::Int),
//!     AvroField::new("name", AvroSchema::String).with_default(json!("anonymous")),
//! ]);
//!
//! let decoder = ResolvingDecoder::new(registry);
//! let Native(user) = decoder.decode_as::<Native<User>>(&[84], &writer, &reader).unwrap();
//! assert_eq!(user, User { id: 42, name: "anonymous".to_string() });
//! ```

mod config;
mod cursor;
mod decoder;
mod defaults;
mod error;
mod registry;
mod resolver;
mod schema;
mod value;

pub use config::{DecoderConfig, MappingFamily, SequenceFamily};
pub use cursor::{AvroCursor, Cursor, CursorError};
pub use decoder::ResolvingDecoder;
pub use defaults::DefaultMaterializer;
pub use error::{DecodeError, DefaultValueError};
pub use registry::{
    ConstructorFactory, EnumBinding, InstanceFactory, RecordBinding, RecordBindingBuilder,
    TypeRegistry, TypeRegistryBuilder,
};
pub use resolver::{ResolvedType, TypeResolver};
pub use schema::{AvroField, AvroSchema, Names};
pub use value::{FromValue, Mapping, Native, NativeObject, Object, Sequence, Value, ValueError};
