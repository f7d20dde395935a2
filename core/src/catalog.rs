//! Option catalog: the read path
//!
//! Current standings straight from the ledger. Nothing is cached and
//! nothing here touches the wallet or the submission pipeline.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use shadowvote_ballot::OptionIndex;
use tracing::debug;

use crate::error::ReadFailure;
use crate::ledger::LedgerReader;

/// One option and its current count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    #[serde(serialize_with = "serialize_index")]
    pub option: OptionIndex,
    pub label: String,
    pub votes: u64,
}

fn serialize_index<S: serde::Serializer>(index: &OptionIndex, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(index.value() as u64)
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.option, self.label, self.votes)
    }
}

pub struct OptionCatalog<R> {
    reader: Arc<R>,
    labels: Vec<String>,
}

impl<R: LedgerReader> OptionCatalog<R> {
    /// Catalog for a ballot with one entry per label
    pub fn new(reader: Arc<R>, labels: Vec<String>) -> Self {
        Self { reader, labels }
    }

    /// Catalog with generated labels for `count` options
    pub fn unlabeled(reader: Arc<R>, count: usize) -> Self {
        let labels = (0..count).map(|i| format!("Option {}", i + 1)).collect();
        Self::new(reader, labels)
    }

    /// Number of options, N
    pub fn option_count(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }

    /// Read every option's tally, in ballot order
    pub async fn fetch_all(&self) -> Result<Vec<Tally>, ReadFailure> {
        let counts = self.reader.tallies().await?;
        if counts.len() != self.labels.len() {
            return Err(ReadFailure::Shape {
                expected: self.labels.len(),
                got: counts.len(),
            });
        }
        debug!(options = counts.len(), "fetched tallies");

        Ok(self
            .labels
            .iter()
            .zip(counts)
            .enumerate()
            .map(|(i, (label, votes))| Tally {
                option: OptionIndex(i),
                label: label.clone(),
                votes,
            })
            .collect())
    }
}
