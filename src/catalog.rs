//! Catalog of indexed feature archives

use crate::error::{Result, SampleError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One indexed feature archive and its categorical attributes.
///
/// Entries are immutable once indexed; downstream structures refer to them
/// by catalog key rather than by copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Path to the `.npz` feature archive (named array `"cqt"`)
    pub features: PathBuf,
    /// Optional path to the embedding-prediction archive (named array `"z_out"`)
    pub prediction: Option<PathBuf>,
    /// Instrument code, e.g. "VI" or "KLB"
    pub instrument: String,
    /// MIDI note number
    pub note_number: i32,
    /// File code distinguishing takes of the same instrument/note
    pub fcode: String,
}

impl CatalogEntry {
    /// Composite catalog key: `{instrument}_{note_number}_{fcode}`
    pub fn key(&self) -> String {
        format!("{}_{}_{}", self.instrument, self.note_number, self.fcode)
    }

    /// Composite instrument/pitch label: `{instrument}_{note_number}`
    pub fn inst_note(&self) -> String {
        format!("{}_{}", self.instrument, self.note_number)
    }
}

/// An ordered mapping from composite keys to catalog entries.
///
/// Keys are unique; iteration order is deterministic but carries no
/// sampling semantics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    /// Build a catalog from a collection of entries, keyed by composite key
    pub fn from_entries<I: IntoIterator<Item = CatalogEntry>>(entries: I) -> Self {
        let mut map = BTreeMap::new();
        for entry in entries {
            map.insert(entry.key(), entry);
        }
        Catalog { entries: map }
    }

    /// Look up an entry, reporting the missing key on failure
    pub fn get(&self, key: &str) -> Result<&CatalogEntry> {
        self.entries
            .get(key)
            .ok_or_else(|| SampleError::UnknownCatalogEntry(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CatalogEntry)> {
        self.entries.iter()
    }

    /// Randomly partition the catalog into two disjoint catalogs.
    ///
    /// `ratio` is the fraction of entries assigned to the first partition.
    pub fn split(&self, ratio: f64, rng: &mut StdRng) -> (Catalog, Catalog) {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.shuffle(rng);

        let cut = (ratio * keys.len() as f64) as usize;
        let first = Catalog::from_entries(
            keys[..cut].iter().map(|k| self.entries[*k].clone()),
        );
        let second = Catalog::from_entries(
            keys[cut..].iter().map(|k| self.entries[*k].clone()),
        );
        (first, second)
    }
}

/// Parse an archive file stem into (instrument, note_number, fcode).
///
/// Stems follow the `ICODE_NOTE_FCODE` layout; trailing components after the
/// first three are ignored.
pub fn parse_filename(path: &Path, sep: char) -> Result<(String, i32, String)> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| SampleError::FilenameParseError(format!("{}", path.display())))?;

    let parts: Vec<&str> = stem.split(sep).collect();
    if parts.len() < 3 {
        return Err(SampleError::FilenameParseError(format!(
            "expected at least 3 '{}'-separated fields in '{}'",
            sep, stem
        )));
    }

    let note_number: i32 = parts[1].parse().map_err(|_| {
        SampleError::FilenameParseError(format!(
            "non-numeric note number '{}' in '{}'",
            parts[1], stem
        ))
    })?;

    Ok((parts[0].to_string(), note_number, parts[2].to_string()))
}

/// Index a directory of `.npz` feature archives into a catalog.
///
/// A sibling file with the same stem under `predictions` (when given) is
/// recorded as the entry's embedding archive.
pub fn index_directory(
    base_dir: &Path,
    predictions: Option<&Path>,
    sep: char,
) -> Result<Catalog> {
    let mut entries = Vec::new();

    let listing = std::fs::read_dir(base_dir).map_err(|err| {
        SampleError::CatalogIndexError(format!("{}: {}", base_dir.display(), err))
    })?;

    for item in listing {
        let path = item
            .map_err(|err| {
                SampleError::CatalogIndexError(format!("{}: {}", base_dir.display(), err))
            })?
            .path();
        if path.extension().and_then(|e| e.to_str()) != Some("npz") {
            continue;
        }

        let (instrument, note_number, fcode) = parse_filename(&path, sep)?;
        let prediction = predictions.and_then(|pdir| {
            let candidate = pdir.join(path.file_name().unwrap_or_default());
            candidate.is_file().then_some(candidate)
        });

        entries.push(CatalogEntry {
            features: path,
            prediction,
            instrument,
            note_number,
            fcode,
        });
    }

    Ok(Catalog::from_entries(entries))
}
