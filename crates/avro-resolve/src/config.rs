//! Decoder configuration.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::registry::{ConstructorFactory, InstanceFactory};

/// Container family backing decoded `array` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceFamily {
    /// `Vec<Value>`.
    #[default]
    List,
    /// `VecDeque<Value>`.
    Deque,
}

/// Container family backing decoded `map` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingFamily {
    /// `IndexMap<String, Value>`, insertion ordered.
    #[default]
    Ordered,
    /// `BTreeMap<String, Value>`, key ordered.
    Sorted,
    /// `HashMap<String, Value>`.
    Hashed,
}

/// Options fixed when a [`ResolvingDecoder`](crate::ResolvingDecoder) is built.
///
/// The container families can be loaded from any serde format:
///
/// ```
/// use avro_resolve::{DecoderConfig, MappingFamily, SequenceFamily};
///
/// let config: DecoderConfig =
///     serde_json::from_str(r#"{"sequence_family": "deque", "mapping_family": "sorted"}"#).unwrap();
/// assert_eq!(config.sequence_family, SequenceFamily::Deque);
/// assert_eq!(config.mapping_family, MappingFamily::Sorted);
/// ```
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecoderConfig {
    pub sequence_family: SequenceFamily,
    pub mapping_family: MappingFamily,
    /// Allocates record instances; not loadable from configuration files.
    #[serde(skip, default = "default_instance_factory")]
    pub instance_factory: Arc<dyn InstanceFactory>,
}

fn default_instance_factory() -> Arc<dyn InstanceFactory> {
    Arc::new(ConstructorFactory)
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            sequence_family: SequenceFamily::default(),
            mapping_family: MappingFamily::default(),
            instance_factory: default_instance_factory(),
        }
    }
}

impl DecoderConfig {
    pub fn with_sequence_family(mut self, family: SequenceFamily) -> Self {
        self.sequence_family = family;
        self
    }

    pub fn with_mapping_family(mut self, family: MappingFamily) -> Self {
        self.mapping_family = family;
        self
    }

    pub fn with_instance_factory(mut self, factory: impl InstanceFactory + 'static) -> Self {
        self.instance_factory = Arc::new(factory);
        self
    }
}

impl fmt::Debug for DecoderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderConfig")
            .field("sequence_family", &self.sequence_family)
            .field("mapping_family", &self.mapping_family)
            .finish_non_exhaustive()
    }
}
