use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

/// One (tag, attribute) occurrence found while parsing an archive page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAttributeRow {
    /// The HTML element name, e.g. `script`, never absent
    pub tag: String,
    /// The attribute name, e.g. `src`
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attribute: String,
    /// The attribute value as parsed, may be empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: String,
    /// The raw tag source text
    #[serde(default, deserialize_with = "null_as_empty")]
    pub original: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

impl TagAttributeRow {
    pub fn new(tag: &str, attribute: &str, value: &str, original: &str) -> Self {
        Self {
            tag: tag.to_owned(),
            attribute: attribute.to_owned(),
            value: value.to_owned(),
            original: original.to_owned(),
        }
    }
}

/// The loaded snapshot, split into partitions which become the map tasks
/// Cloning only bumps the reference count, the rows are never mutated after loading
#[derive(Debug, Clone)]
pub struct Table {
    partitions: Arc<Vec<Vec<TagAttributeRow>>>,
}

impl Table {
    /// Deal the rows round-robin into `partitions` buckets
    /// A zero partition count is treated as one
    pub fn new(rows: Vec<TagAttributeRow>, partitions: usize) -> Self {
        let partition_n = partitions.max(1);
        let mut buckets = vec![Vec::new(); partition_n];
        for (i, row) in rows.into_iter().enumerate() {
            buckets[i % partition_n].push(row);
        }
        Self {
            partitions: Arc::new(buckets),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 1)
    }

    pub fn partitions(&self) -> &[Vec<TagAttributeRow>] {
        &self.partitions
    }

    pub fn partition_n(&self) -> usize {
        self.partitions.len()
    }

    pub fn len(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One line of an extractor's ranked output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedCount {
    pub key: String,
    pub count: u64,
}

impl AggregatedCount {
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }
}
