//! Shared fixtures: a minimal Avro binary writer, schema shorthands and the
//! native types the matrices decode into.

#![allow(dead_code)]

use std::str::FromStr;

use avro_resolve::{
    AvroField, AvroSchema, EnumBinding, Native, RecordBinding, Sequence, SequenceFamily,
    TypeRegistry, Value,
};
use indexmap::IndexMap;

// ---------------------------------------------------------------- writer

/// Writes Avro binary values into a byte buffer.
#[derive(Default)]
pub struct AvroWriter {
    buf: Vec<u8>,
}

impl AvroWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boolean(&mut self, b: bool) -> &mut Self {
        self.buf.push(u8::from(b));
        self
    }

    pub fn int(&mut self, n: i32) -> &mut Self {
        self.long(n.into())
    }

    pub fn long(&mut self, n: i64) -> &mut Self {
        let mut zz = ((n << 1) ^ (n >> 63)) as u64;
        loop {
            let low7 = (zz & 0x7f) as u8;
            zz >>= 7;
            if zz == 0 {
                self.buf.push(low7);
                return self;
            }
            self.buf.push(low7 | 0x80);
        }
    }

    pub fn float(&mut self, n: f32) -> &mut Self {
        self.buf.extend_from_slice(&n.to_le_bytes());
        self
    }

    pub fn double(&mut self, n: f64) -> &mut Self {
        self.buf.extend_from_slice(&n.to_le_bytes());
        self
    }

    pub fn bytes(&mut self, b: &[u8]) -> &mut Self {
        self.long(b.len() as i64);
        self.raw(b)
    }

    pub fn str(&mut self, s: &str) -> &mut Self {
        self.bytes(s.as_bytes())
    }

    /// Unprefixed bytes, as `fixed` values are written.
    pub fn raw(&mut self, b: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(b);
        self
    }

    pub fn union_index(&mut self, index: i64) -> &mut Self {
        self.long(index)
    }

    pub fn enum_ordinal(&mut self, ordinal: i32) -> &mut Self {
        self.int(ordinal)
    }

    /// Block header with a positive item count.
    pub fn block(&mut self, count: i64) -> &mut Self {
        self.long(count)
    }

    /// Block header in the negative-count form, followed by the block size.
    pub fn sized_block(&mut self, count: i64, byte_size: i64) -> &mut Self {
        self.long(-count);
        self.long(byte_size)
    }

    pub fn end_blocks(&mut self) -> &mut Self {
        self.long(0)
    }

    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

// ---------------------------------------------------------------- schemas

pub fn record(name: &str, fields: Vec<AvroField>) -> AvroSchema {
    AvroSchema::Record {
        name: name.to_string(),
        namespace: None,
        fields,
        aliases: Vec::new(),
        doc: None,
    }
}

pub fn field(name: &str, type_: AvroSchema) -> AvroField {
    AvroField::new(name, type_)
}

pub fn enumeration(name: &str, symbols: &[&str]) -> AvroSchema {
    AvroSchema::Enum {
        name: name.to_string(),
        namespace: None,
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        default: None,
        aliases: Vec::new(),
    }
}

pub fn enumeration_with_default(name: &str, symbols: &[&str], default: &str) -> AvroSchema {
    match enumeration(name, symbols) {
        AvroSchema::Enum {
            name,
            namespace,
            symbols,
            aliases,
            ..
        } => AvroSchema::Enum {
            name,
            namespace,
            symbols,
            default: Some(default.to_string()),
            aliases,
        },
        other => other,
    }
}

pub fn fixed(name: &str, size: usize) -> AvroSchema {
    AvroSchema::Fixed {
        name: name.to_string(),
        namespace: None,
        size,
        aliases: Vec::new(),
    }
}

pub fn array(items: AvroSchema) -> AvroSchema {
    AvroSchema::Array {
        items: Box::new(items),
    }
}

pub fn map(values: AvroSchema) -> AvroSchema {
    AvroSchema::Map {
        values: Box::new(values),
    }
}

pub fn nullable(inner: AvroSchema) -> AvroSchema {
    AvroSchema::Union(vec![AvroSchema::Null, inner])
}

// ---------------------------------------------------------------- native types

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Red,
    Green,
    Blue,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown symbol `{0}`")]
pub struct UnknownSymbol(pub String);

impl FromStr for Color {
    type Err = UnknownSymbol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RED" => Ok(Color::Red),
            "GREEN" => Ok(Color::Green),
            "BLUE" => Ok(Color::Blue),
            other => Err(UnknownSymbol(other.to_string())),
        }
    }
}

/// Native enum with only two of the three symbols a writer may know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Letter {
    A,
    B,
}

impl FromStr for Letter {
    type Err = UnknownSymbol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Letter::A),
            "B" => Ok(Letter::B),
            other => Err(UnknownSymbol(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Triple {
    pub a: i32,
    pub c: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pair {
    pub a: i32,
    pub c: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Profile {
    pub id: i64,
    pub nickname: String,
    pub score: f64,
    pub tags: Vec<String>,
    pub color: Color,
    pub avatar: Vec<u8>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bag {
    pub items: Vec<i32>,
    pub counts: IndexMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Inner {
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outer {
    pub inner: Inner,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub value: i32,
    pub next: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tail {
    pub n: i64,
}

/// Registry holding every fixture type above.
pub fn registry() -> TypeRegistry {
    TypeRegistry::builder()
        .enumeration(EnumBinding::new::<Color>("Color"))
        .enumeration(EnumBinding::new::<Letter>("Letter"))
        .record(
            RecordBinding::builder::<Triple>("Triple")
                .constructor(Triple::default)
                .field("a", |t: &mut Triple, v: i32| t.a = v)
                .field("c", |t: &mut Triple, v: String| t.c = v)
                .build(),
        )
        .record(
            RecordBinding::builder::<Pair>("Pair")
                .constructor(Pair::default)
                .field("a", |p: &mut Pair, v: i32| p.a = v)
                .field("c", |p: &mut Pair, v: i64| p.c = v)
                .build(),
        )
        .record(
            RecordBinding::builder::<Profile>("Profile")
                .constructor(Profile::default)
                .field("id", |p: &mut Profile, v: i64| p.id = v)
                .field("nickname", |p: &mut Profile, v: String| p.nickname = v)
                .field("score", |p: &mut Profile, v: f64| p.score = v)
                .field("tags", |p: &mut Profile, v: Vec<String>| p.tags = v)
                .field("color", |p: &mut Profile, v: Native<Color>| p.color = v.0)
                .field("avatar", |p: &mut Profile, v: Vec<u8>| p.avatar = v)
                .field("email", |p: &mut Profile, v: Option<String>| p.email = v)
                .build(),
        )
        .record(
            RecordBinding::builder::<Bag>("Bag")
                .constructor(Bag::default)
                .field_with_getter(
                    "items",
                    |b: &Bag| {
                        let mut seq = Sequence::new(SequenceFamily::List);
                        for n in &b.items {
                            seq.push(Value::Int(*n));
                        }
                        Value::Array(seq)
                    },
                    |b: &mut Bag, v: Vec<i32>| b.items = v,
                )
                .field("counts", |b: &mut Bag, v: IndexMap<String, i64>| b.counts = v)
                .build(),
        )
        .record(
            RecordBinding::builder::<Inner>("Inner")
                .constructor(Inner::default)
                .field("value", |i: &mut Inner, v: i64| i.value = v)
                .build(),
        )
        .record(
            RecordBinding::builder::<Outer>("Outer")
                .constructor(Outer::default)
                .field("inner", |o: &mut Outer, v: Native<Inner>| o.inner = v.0)
                .field("label", |o: &mut Outer, v: String| o.label = v)
                .build(),
        )
        .record(
            RecordBinding::builder::<Node>("Node")
                .constructor(Node::default)
                .field("value", |n: &mut Node, v: i32| n.value = v)
                .field("next", |n: &mut Node, v: Option<Native<Node>>| {
                    n.next = v.map(|v| Box::new(v.0))
                })
                .build(),
        )
        .record(
            RecordBinding::builder::<Tail>("Tail")
                .constructor(Tail::default)
                .field("n", |t: &mut Tail, v: i64| t.n = v)
                .build(),
        )
        .build()
}

/// `Node { value: int, next: [null, Node] }`.
pub fn node_schema() -> AvroSchema {
    record(
        "Node",
        vec![
            field("value", AvroSchema::Int),
            field("next", nullable(AvroSchema::Ref("Node".to_string()))),
        ],
    )
}
