use std::{collections::hash_map::DefaultHasher, hash::{Hash, Hasher}};

use rayon::prelude::*;
use tracing::debug;

use crate::mr::{
    function::{MapFn, ReduceFn},
    table::{Table, TagAttributeRow},
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyValue {
    pub key: String,
    pub value: u64,
}

impl KeyValue {
    pub fn new(key: String, value: u64) -> Self {
        Self { key, value }
    }
}

/// Execution knobs, the result never depends on them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecConfig {
    /// The number of reduce buckets the intermediate pairs are hashed into
    pub reduce_n: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self { reduce_n: 4 }
    }
}

/// Calls the map function on every row of one partition
pub fn call_map_func(map_func: MapFn, rows: &[TagAttributeRow]) -> Vec<KeyValue> {
    rows.iter().flat_map(map_func).collect()
}

/// Calls the reduce function on the values collected for one key
pub fn call_reduce_func(reduce_func: ReduceFn, key: &str, values: &[u64]) -> u64 {
    reduce_func(key, values)
}

/// Runs one application over a table in-process
/// Each table partition is a map task, each hash bucket is a reduce task,
/// both phases are spread over the rayon thread pool
pub struct Worker {
    /// The total reduce tasks, used to bucket the intermediate pairs (Usually with hash function)
    reduce_n: usize,
}

impl Worker {
    pub fn new(config: ExecConfig) -> Self {
        Self {
            // A zero bucket count would leave nowhere to put the pairs
            reduce_n: config.reduce_n.max(1),
        }
    }

    fn cal_hash_for_key(key: &str) -> u64 {
        let mut s = DefaultHasher::new();
        key.hash(&mut s);
        s.finish()
    }

    /// Do one map task, the output is indexed by reduce task id
    pub fn map(&self, map_task_id: usize, rows: &[TagAttributeRow], map_func: MapFn) -> Vec<Vec<KeyValue>> {
        let key_value_pairs = call_map_func(map_func, rows);
        debug!(
            "[Map] Map task #{} turned {} row(s) into {} intermediate pair(s)",
            map_task_id,
            rows.len(),
            key_value_pairs.len()
        );
        let mut buckets = vec![Vec::new(); self.reduce_n];
        for kv in key_value_pairs {
            let index = (Self::cal_hash_for_key(&kv.key) % self.reduce_n as u64) as usize;
            buckets[index].push(kv);
        }
        buckets
    }

    /// Do one reduce task over the pairs every map task routed to it
    pub fn reduce(&self, reduce_task_id: usize, mut key_value_contents: Vec<KeyValue>, reduce_func: ReduceFn) -> Vec<KeyValue> {
        // Sort the key-value pairs based on key so equal keys sit next to each other
        key_value_contents.sort_by(|lhs, rhs| lhs.key.cmp(&rhs.key));

        let mut output = Vec::new();
        let mut values = Vec::new();
        let mut iter = key_value_contents.into_iter().peekable();
        while let Some(kv) = iter.next() {
            values.push(kv.value);
            let group_ends = iter.peek().map_or(true, |next| next.key != kv.key);
            if group_ends {
                let reduce_result = call_reduce_func(reduce_func, &kv.key, &values);
                output.push(KeyValue::new(kv.key, reduce_result));
                values.clear();
            }
        }
        debug!("[Reduce] Reduce task #{} produced {} group(s)", reduce_task_id, output.len());
        output
    }

    /// Run both phases and return the reduced `(key, count)` pairs in no particular order
    pub fn run(&self, table: &Table, map_func: MapFn, reduce_func: ReduceFn) -> Vec<KeyValue> {
        // intermediate[m][r] holds what map task `m` sent to reduce task `r`
        let intermediate = table
            .partitions()
            .par_iter()
            .enumerate()
            .map(|(map_task_id, rows)| self.map(map_task_id, rows, map_func))
            .collect::<Vec<_>>();

        (0..self.reduce_n)
            .into_par_iter()
            .map(|reduce_task_id| {
                let contents = intermediate
                    .iter()
                    .flat_map(|buckets| buckets[reduce_task_id].iter().cloned())
                    .collect::<Vec<_>>();
                self.reduce(reduce_task_id, contents, reduce_func)
            })
            .flatten()
            .collect()
    }
}
