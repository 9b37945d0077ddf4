//! Neighborhood construction over a catalog

use crate::catalog::Catalog;
use crate::config::NeighborMode;
use std::collections::{BTreeMap, BTreeSet};

/// Named buckets of related catalog entry keys.
///
/// Every key referenced by a bucket exists in the catalog the neighborhoods
/// were built from. Buckets may overlap across grouping policies.
pub type Neighborhoods = BTreeMap<String, Vec<String>>;

/// Build neighborhoods for the given grouping policy
pub fn build_neighbors(catalog: &Catalog, mode: &NeighborMode) -> Neighborhoods {
    match mode {
        NeighborMode::Instrument => instrument_neighbors(catalog),
        NeighborMode::Pitch => pitch_neighbors(catalog),
        NeighborMode::InstrumentPitch {
            pitch_delta,
            min_population,
        } => instrument_pitch_neighbors(catalog, *pitch_delta, *min_population),
    }
}

/// One bucket per distinct instrument code
pub fn instrument_neighbors(catalog: &Catalog) -> Neighborhoods {
    let mut neighbors = Neighborhoods::new();
    for (key, entry) in catalog.iter() {
        neighbors
            .entry(entry.instrument.clone())
            .or_default()
            .push(key.clone());
    }
    neighbors
}

/// One bucket per distinct note number
pub fn pitch_neighbors(catalog: &Catalog) -> Neighborhoods {
    let mut neighbors = Neighborhoods::new();
    for (key, entry) in catalog.iter() {
        neighbors
            .entry(entry.note_number.to_string())
            .or_default()
            .push(key.clone());
    }
    neighbors
}

/// One bucket per (instrument, note-number window) pair.
///
/// Membership is every entry of the same instrument whose note number lies
/// within `pitch_delta` (inclusive) of the bucket's center note. A bucket is
/// kept only when its population is strictly greater than `min_population`;
/// the standalone `population_filter` uses greater-or-equal instead, and the
/// two thresholds are intentionally not unified.
pub fn instrument_pitch_neighbors(
    catalog: &Catalog,
    pitch_delta: i32,
    min_population: usize,
) -> Neighborhoods {
    let instruments: BTreeSet<&str> =
        catalog.iter().map(|(_, e)| e.instrument.as_str()).collect();
    let notes: BTreeSet<i32> = catalog.iter().map(|(_, e)| e.note_number).collect();

    let mut neighbors = Neighborhoods::new();
    for instrument in &instruments {
        for &note in &notes {
            let members: Vec<String> = catalog
                .iter()
                .filter(|(_, e)| {
                    e.instrument == *instrument && (e.note_number - note).abs() <= pitch_delta
                })
                .map(|(k, _)| k.clone())
                .collect();
            if members.len() > min_population {
                neighbors.insert(format!("{}_{}", instrument, note), members);
            }
        }
    }
    neighbors
}

/// Drop buckets whose population falls below `min_population` (inclusive keep)
pub fn population_filter(neighbors: Neighborhoods, min_population: usize) -> Neighborhoods {
    neighbors
        .into_iter()
        .filter(|(_, members)| members.len() >= min_population)
        .collect()
}
