use thiserror::Error;

use crate::cursor::CursorError;
use crate::registry::BoxError;
use crate::value::ValueError;

/// A default literal does not fit its schema, or a required default is missing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid default at `{path}`: {reason}")]
pub struct DefaultValueError {
    pub reason: String,
    pub path: String,
}

impl DefaultValueError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            path: path.into(),
        }
    }
}

/// Any failure of a resolving decode call.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("unsupported schema: {0}")]
    UnsupportedSchema(String),

    #[error("no native enum type registered for `{0}`")]
    UnknownEnumType(String),

    #[error("no native record type registered for `{0}`")]
    UnknownRecordType(String),

    #[error("fixed `{name}` size mismatch: writer {writer}, reader {reader}")]
    SizeMismatch {
        name: String,
        writer: usize,
        reader: usize,
    },

    #[error(transparent)]
    DefaultValue(#[from] DefaultValueError),

    #[error("failed to decode field `{field}` of `{record}`")]
    Field {
        record: String,
        field: String,
        #[source]
        source: Box<DecodeError>,
    },

    #[error(transparent)]
    Cursor(#[from] CursorError),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("enum `{name}` has no symbol at ordinal {ordinal}")]
    EnumOrdinal { name: String, ordinal: usize },

    #[error("`{symbol}` is not a member of enum type `{type_name}`")]
    EnumParse {
        type_name: String,
        symbol: String,
        #[source]
        source: BoxError,
    },

    #[error("union index {index} out of range for {branches} branches")]
    UnionIndex { index: usize, branches: usize },

    #[error("no reader union branch matches writer `{writer}`")]
    NoMatchingBranch { writer: String },

    #[error("writer `{writer}` cannot be read as reader `{reader}`")]
    Incompatible { writer: String, reader: String },

    #[error("record type `{0}` has no constructor")]
    NoConstructor(String),

    #[error("record type `{record}` has no accessor for field `{field}`")]
    UnknownField { record: String, field: String },

    #[error("cannot set field `{field}` on `{record}`")]
    FieldAccess {
        record: String,
        field: String,
        #[source]
        source: ValueError,
    },
}

impl DecodeError {
    /// Wraps `self` as the cause of a failure in `record.field`.
    pub fn in_field(self, record: impl Into<String>, field: impl Into<String>) -> Self {
        DecodeError::Field {
            record: record.into(),
            field: field.into(),
            source: Box::new(self),
        }
    }

    /// Field names from the outermost record down to the failing value.
    pub fn field_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = self;
        while let DecodeError::Field { field, source, .. } = current {
            path.push(field.as_str());
            current = &**source;
        }
        path
    }

    /// The innermost error, past every field wrapper.
    pub fn root_cause(&self) -> &DecodeError {
        let mut current = self;
        while let DecodeError::Field { source, .. } = current {
            current = &**source;
        }
        current
    }

    pub(crate) fn incompatible(writer: &crate::AvroSchema, reader: &crate::AvroSchema) -> Self {
        DecodeError::Incompatible {
            writer: writer.label(),
            reader: reader.label(),
        }
    }
}
