use thiserror::Error;

/// The only error that stops a run, anything odd inside the rows themselves
/// (no `.js` match, undecodable bytes) is carried as data and filtered at the end
#[derive(Debug, Error)]
pub enum LoadError {
    /// The location could not be opened or fetched
    #[error("archive table `{location}` is unreachable: {reason}")]
    Unreachable { location: String, reason: String },

    /// The location was read but a line could not be parsed into a row
    #[error("archive table `{location}` is malformed at line {line}: {reason}")]
    Malformed {
        location: String,
        line: usize,
        reason: String,
    },

    /// Nothing to load
    #[error("no archive locations were given")]
    NoInput,

    /// The table must be split into at least one partition
    #[error("partition count must be positive, got {0}")]
    InvalidPartitions(usize),
}

impl LoadError {
    pub fn unreachable(location: &str, reason: impl ToString) -> Self {
        Self::Unreachable {
            location: location.to_owned(),
            reason: reason.to_string(),
        }
    }
}
