//! The two ranked queries and the row count, plus the loader-driven run that strings them together

use serde::Serialize;
use tracing::info;

use crate::mr::{
    error::LoadError,
    function::{self, is_displayable, truncate_key, DISPLAY_WIDTH},
    loader::Loader,
    table::{AggregatedCount, Table},
    worker::{ExecConfig, KeyValue, Worker},
};

/// Number of rows in the table
pub fn count(table: &Table) -> usize {
    table.len()
}

/// Highest count first, equal counts by key so reruns print the same thing
pub fn rank(pairs: Vec<KeyValue>) -> Vec<AggregatedCount> {
    let mut ranked = pairs
        .into_iter()
        .map(|kv| AggregatedCount::new(kv.key, kv.value))
        .collect::<Vec<_>>();
    ranked.sort_by(|lhs, rhs| rhs.count.cmp(&lhs.count).then_with(|| lhs.key.cmp(&rhs.key)));
    ranked
}

pub fn truncate_keys(counts: Vec<AggregatedCount>, width: usize) -> Vec<AggregatedCount> {
    counts
        .into_iter()
        .map(|c| AggregatedCount::new(truncate_key(&c.key, width), c.count))
        .collect()
}

pub fn drop_undisplayable(counts: Vec<AggregatedCount>) -> Vec<AggregatedCount> {
    counts.into_iter().filter(|c| is_displayable(&c.key)).collect()
}

fn apply_limit(mut counts: Vec<AggregatedCount>, limit: Option<usize>) -> Vec<AggregatedCount> {
    if let Some(limit) = limit {
        counts.truncate(limit);
    }
    counts
}

/// Most referenced script files, keys are grouped in full and cut for display afterwards
pub fn top_js_libraries(table: &Table, limit: Option<usize>) -> Vec<AggregatedCount> {
    top_js_libraries_with(table, limit, ExecConfig::default())
}

pub fn top_js_libraries_with(table: &Table, limit: Option<usize>, config: ExecConfig) -> Vec<AggregatedCount> {
    let reduced = Worker::new(config).run(table, function::js_libraries::map, function::js_libraries::reduce);
    let ranked = drop_undisplayable(truncate_keys(rank(reduced), DISPLAY_WIDTH));
    info!("[Rank] {} script librar(ies) after filtering", ranked.len());
    apply_limit(ranked, limit)
}

/// Most used meta keywords, keys are trimmed and cut before grouping
pub fn top_keywords(table: &Table, limit: Option<usize>) -> Vec<AggregatedCount> {
    top_keywords_with(table, limit, ExecConfig::default())
}

pub fn top_keywords_with(table: &Table, limit: Option<usize>, config: ExecConfig) -> Vec<AggregatedCount> {
    let reduced = Worker::new(config).run(table, function::keywords::map, function::keywords::reduce);
    let ranked = drop_undisplayable(rank(reduced));
    info!("[Rank] {} keyword(s) after filtering", ranked.len());
    apply_limit(ranked, limit)
}

/// Everything one run produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub total_rows: usize,
    pub js_libraries: Vec<AggregatedCount>,
    pub keywords: Vec<AggregatedCount>,
}

/// Loads once through the injected loader, then answers every query over the same table
pub struct Pipeline<L> {
    loader: L,
    config: ExecConfig,
    limit: Option<usize>,
}

impl<L: Loader> Pipeline<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            config: ExecConfig::default(),
            limit: None,
        }
    }

    pub fn with_config(mut self, config: ExecConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub async fn load(&self, locations: &[String], partitions: usize) -> Result<Table, LoadError> {
        self.loader.load(locations, partitions).await
    }

    pub fn scripts(&self, table: &Table) -> Vec<AggregatedCount> {
        top_js_libraries_with(table, self.limit, self.config)
    }

    pub fn keywords(&self, table: &Table) -> Vec<AggregatedCount> {
        top_keywords_with(table, self.limit, self.config)
    }

    /// Both extractors only read the table, so they run side by side
    pub fn analyze(&self, table: &Table) -> Report {
        let (limit, config) = (self.limit, self.config);
        let (js_libraries, keywords) = rayon::join(
            || top_js_libraries_with(table, limit, config),
            || top_keywords_with(table, limit, config),
        );
        Report {
            total_rows: count(table),
            js_libraries,
            keywords,
        }
    }

    /// A failed load aborts before any aggregation happens
    pub async fn run(&self, locations: &[String], partitions: usize) -> Result<Report, LoadError> {
        let table = self.load(locations, partitions).await?;
        info!("[Load] Table holds {} row(s)", count(&table));
        Ok(self.analyze(&table))
    }
}
