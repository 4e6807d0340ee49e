//! Getting the tag table in
//!
//! The archive parsing happens elsewhere, a [`Loader`] only hands back the rows it produced.
//! [`RowFileLoader`] reads the parser's JSON Lines output from disk or over HTTP,
//! [`MemoryLoader`] serves rows that were put into it directly.

use std::{collections::HashMap, future::Future, path::Path};

use futures::future::try_join_all;
use tracing::{debug, info, warn};

use crate::mr::{
    error::LoadError,
    table::{Table, TagAttributeRow},
};

/// The capability the pipeline is given to obtain its table
pub trait Loader {
    /// Load every location and split the rows into `partitions` partitions
    /// Any unreachable or malformed location fails the whole load
    fn load(
        &self,
        locations: &[String],
        partitions: usize,
    ) -> impl Future<Output = Result<Table, LoadError>> + Send;
}

fn check_request(locations: &[String], partitions: usize) -> Result<(), LoadError> {
    if locations.is_empty() {
        return Err(LoadError::NoInput);
    }
    if partitions == 0 {
        return Err(LoadError::InvalidPartitions(partitions));
    }
    Ok(())
}

/// Rows registered per location ahead of time
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    sources: HashMap<String, Vec<TagAttributeRow>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, location: &str, rows: Vec<TagAttributeRow>) -> Self {
        self.sources.insert(location.to_owned(), rows);
        self
    }
}

impl Loader for MemoryLoader {
    fn load(
        &self,
        locations: &[String],
        partitions: usize,
    ) -> impl Future<Output = Result<Table, LoadError>> + Send {
        let result = check_request(locations, partitions).and_then(|_| {
            let mut rows = Vec::new();
            for location in locations {
                let source = self
                    .sources
                    .get(location)
                    .ok_or_else(|| LoadError::unreachable(location, "no such source"))?;
                rows.extend(source.iter().cloned());
            }
            Ok(Table::new(rows, partitions))
        });
        async move { result }
    }
}

/// Reads the JSON Lines row files written by the archive parser
/// Accepts plain paths, `file://` and `http(s)://` locations
#[derive(Debug, Clone, Default)]
pub struct RowFileLoader {
    client: reqwest::Client,
}

impl RowFileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured HTTP client (proxies, timeouts) for remote locations
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, location: &str) -> Result<Vec<u8>, LoadError> {
        if location.starts_with("http://") || location.starts_with("https://") {
            let response = self
                .client
                .get(location)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| LoadError::unreachable(location, e))?;
            let bytes = response
                .bytes()
                .await
                .map_err(|e| LoadError::unreachable(location, e))?;
            return Ok(bytes.to_vec());
        }

        let path = match location.strip_prefix("file://") {
            Some(path) => path,
            None if location.contains("://") => {
                return Err(LoadError::unreachable(location, "unsupported location scheme"));
            }
            None => location,
        };
        tokio::fs::read(Path::new(path))
            .await
            .map_err(|e| LoadError::unreachable(location, e))
    }

    async fn load_one(&self, location: &str) -> Result<Vec<TagAttributeRow>, LoadError> {
        let bytes = self.fetch(location).await.map_err(|e| {
            warn!("[Load] {}", e);
            e
        })?;
        let rows = parse_rows(location, &bytes)?;
        debug!("[Load] Read {} row(s) from {}", rows.len(), location);
        Ok(rows)
    }
}

impl Loader for RowFileLoader {
    fn load(
        &self,
        locations: &[String],
        partitions: usize,
    ) -> impl Future<Output = Result<Table, LoadError>> + Send {
        async move {
            check_request(locations, partitions)?;
            let per_location = try_join_all(locations.iter().map(|l| self.load_one(l))).await?;
            let rows = per_location.into_iter().flatten().collect::<Vec<_>>();
            info!(
                "[Load] Loaded {} row(s) from {} location(s) into {} partition(s)",
                rows.len(),
                locations.len(),
                partitions
            );
            Ok(Table::new(rows, partitions))
        }
    }
}

/// Parse one JSON object per line, blank lines are skipped
/// Undecodable bytes turn into U+FFFD rather than failing the load
pub fn parse_rows(location: &str, bytes: &[u8]) -> Result<Vec<TagAttributeRow>, LoadError> {
    let text = String::from_utf8_lossy(bytes);
    let mut rows = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row = serde_json::from_str::<TagAttributeRow>(line).map_err(|e| LoadError::Malformed {
            location: location.to_owned(),
            line: i + 1,
            reason: e.to_string(),
        })?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lines_and_skips_blanks() {
        let input = b"{\"tag\":\"script\",\"attribute\":\"src\",\"value\":\"a.js\",\"original\":\"<script>\"}\n\n{\"tag\":\"meta\"}\n";
        let rows = parse_rows("mem", input).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, "a.js");
        assert_eq!(rows[1].attribute, "");
    }

    #[test]
    fn bad_line_reports_its_number() {
        let input = b"{\"tag\":\"a\"}\nnot json\n";
        match parse_rows("broken.jsonl", input) {
            Err(LoadError::Malformed { location, line, .. }) => {
                assert_eq!(location, "broken.jsonl");
                assert_eq!(line, 2);
            }
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn undecodable_bytes_become_replacement_marker() {
        let mut input = b"{\"tag\":\"meta\",\"value\":\"caf".to_vec();
        input.push(0xff);
        input.extend_from_slice(b"\"}");
        let rows = parse_rows("mem", &input).unwrap();
        assert_eq!(rows[0].value, "caf\u{FFFD}");
    }

    #[tokio::test]
    async fn memory_loader_serves_registered_sources() {
        let loader = MemoryLoader::new()
            .with_source("a", vec![TagAttributeRow::new("script", "src", "a.js", "")])
            .with_source("b", vec![TagAttributeRow::new("meta", "content", "x", "")]);
        let table = loader.load(&["a".into(), "b".into()], 2).await.unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.partition_n(), 2);
    }

    #[tokio::test]
    async fn requests_are_validated() {
        let loader = MemoryLoader::new().with_source("a", Vec::new());
        assert!(matches!(loader.load(&[], 1).await, Err(LoadError::NoInput)));
        assert!(matches!(
            loader.load(&["a".into()], 0).await,
            Err(LoadError::InvalidPartitions(0))
        ));
        assert!(matches!(
            loader.load(&["missing".into()], 1).await,
            Err(LoadError::Unreachable { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_scheme_is_unreachable() {
        let loader = RowFileLoader::new();
        let err = loader.load(&["s3://bucket/part-0".into()], 1).await.unwrap_err();
        assert!(matches!(err, LoadError::Unreachable { .. }));
    }
}
