use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use torso_core::ValidationError;

/// Which input file a record came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dataset {
    /// Position (billet) dataset.
    Positions,
    /// Person (personnel) dataset.
    Personnel,
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dataset::Positions => "positions",
            Dataset::Personnel => "personnel",
        })
    }
}

/// Failure to read or write a dataset or policy file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Structural CSV failure not tied to a single record (header, encoding, writer).
    #[error("{dataset} dataset: {source}")]
    Csv {
        dataset: Dataset,
        #[source]
        source: csv::Error,
    },
    /// A record failed validation. `line` is 1-based and counts the header.
    #[error("malformed {dataset} record at line {line}: {reason}")]
    MalformedInputRecord {
        dataset: Dataset,
        line: u64,
        reason: String,
    },
    #[error("policy file {path}: {source}")]
    Policy {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    /// Records were individually valid but do not form a consistent ledger.
    #[error("inconsistent datasets: {0}")]
    Inconsistent(#[from] ValidationError),
}

impl LoadError {
    pub(crate) fn malformed(dataset: Dataset, line: u64, reason: impl Into<String>) -> Self {
        LoadError::MalformedInputRecord {
            dataset,
            line,
            reason: reason.into(),
        }
    }

    /// Map a csv error onto the record it came from, when it has one.
    pub(crate) fn from_csv(dataset: Dataset, err: csv::Error) -> Self {
        match err.position() {
            Some(pos) if pos.line() > 1 => {
                let line = pos.line();
                let reason = match err.kind() {
                    csv::ErrorKind::Deserialize { err, .. } => err.to_string(),
                    csv::ErrorKind::UnequalLengths {
                        expected_len, len, ..
                    } => format!("expected {expected_len} fields, found {len}"),
                    _ => err.to_string(),
                };
                LoadError::malformed(dataset, line, reason)
            }
            _ => LoadError::Csv {
                dataset,
                source: err,
            },
        }
    }
}
