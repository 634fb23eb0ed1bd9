//! Voter Store: read-only, in-memory view over the voter CSV.
//!
//! Loading validates the header against `REQUIRED_COLUMNS` before any row is
//! parsed, so a file missing columns fails fast with every missing name listed.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::voters::models::{VoterField, VoterFilter, VoterRecord, REQUIRED_COLUMNS};
use crate::voters::sampling::{sample, SampleError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Voter file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read voter file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Missing essential columns in voter data: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Malformed voter data{}: {message}", .line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    Malformed { line: Option<u64>, message: String },
}

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> Self {
        LoadError::Malformed {
            line: err.position().map(|p| p.line()),
            message: err.to_string(),
        }
    }
}

/// Raw CSV row. Every cell is read as text; typing happens in `into_record`.
#[derive(Debug, Deserialize)]
struct VoterRow {
    #[serde(default)]
    voter_id: Option<String>,
    name: String,
    age: String,
    #[serde(default)]
    age_group: Option<String>,
    congressional_district: String,
    ideology: String,
    party_id: String,
    income: String,
    education_expanded: String,
    race_expanded: String,
    voted_2020: String,
    vote_intention_2024: String,
}

impl VoterRow {
    fn into_record(self, row_number: usize) -> Result<VoterRecord, LoadError> {
        // Header is line 1, so data row N sits on line N + 1.
        let line = row_number as u64 + 1;
        let age = parse_age(&self.age, line)?;

        Ok(VoterRecord {
            id: self
                .voter_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| row_number.to_string()),
            name: self.name,
            age,
            age_group: self.age_group.filter(|g| !g.is_empty()),
            congressional_district: self.congressional_district,
            ideology: self.ideology,
            party_id: self.party_id,
            income: self.income,
            education_expanded: self.education_expanded,
            race_expanded: self.race_expanded,
            voted_2020: self.voted_2020,
            vote_intention_2024: self.vote_intention_2024,
        })
    }
}

/// Empty or NaN → no age. Integral floats ("45.0") are accepted since pandas writes them.
fn parse_age(raw: &str, line: u64) -> Result<Option<u32>, LoadError> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if let Ok(age) = raw.parse::<u32>() {
        return Ok(Some(age));
    }
    match raw.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&value) => {
            Ok(Some(value as u32))
        }
        _ => Err(LoadError::Malformed {
            line: Some(line),
            message: format!("age '{raw}' is not an integer"),
        }),
    }
}

#[derive(Debug, Clone, Default)]
pub struct VoterStore {
    records: Vec<VoterRecord>,
}

impl VoterStore {
    /// Loads and validates the voter file at `path`.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                error!("Voter file {} not found", path.display());
                LoadError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                LoadError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let store = Self::from_reader(file)?;
        info!(
            "Loaded {} voter records from {} ({} eligible)",
            store.len(),
            path.display(),
            store.records.iter().filter(|r| r.is_complete()).count()
        );
        Ok(store)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|column| !headers.iter().any(|h| h == **column))
            .map(|column| column.to_string())
            .collect();
        if !missing.is_empty() {
            let err = LoadError::MissingColumns(missing);
            error!("{err}");
            return Err(err);
        }

        let mut records = Vec::new();
        for (index, row) in csv_reader.deserialize::<VoterRow>().enumerate() {
            records.push(row?.into_record(index + 1)?);
        }

        debug!("Parsed {} voter rows", records.len());
        Ok(Self { records })
    }

    pub fn records(&self) -> &[VoterRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records satisfying every constraint, in source order.
    pub fn filter(&self, filter: &VoterFilter) -> Vec<&VoterRecord> {
        self.records.iter().filter(|r| filter.matches(r)).collect()
    }

    /// Sorted distinct non-empty values of `field`.
    pub fn facets(&self, field: VoterField) -> Vec<String> {
        self.records
            .iter()
            .map(|r| field.value(r))
            .filter(|v| !v.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Filter, drop records with missing attributes, then sample.
    /// An empty pool yields an empty sample rather than an error.
    pub fn query(
        &self,
        filter: &VoterFilter,
        sample_size: i64,
        seed: Option<u64>,
    ) -> Result<Vec<VoterRecord>, SampleError> {
        let pool: Vec<&VoterRecord> = self
            .filter(filter)
            .into_iter()
            .filter(|r| r.is_complete())
            .collect();

        let drawn = sample(&pool, sample_size, seed)?;
        debug!(
            "Sampled {} of {} eligible voters (requested {})",
            drawn.len(),
            pool.len(),
            sample_size
        );
        Ok(drawn.into_iter().cloned().collect())
    }
}
