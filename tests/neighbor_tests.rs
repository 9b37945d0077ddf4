//! Validation tests for neighborhood construction and population filtering

use std::path::PathBuf;
use timbre_stream::catalog::{Catalog, CatalogEntry};
use timbre_stream::config::NeighborMode;
use timbre_stream::neighbors::{
    build_neighbors, instrument_neighbors, instrument_pitch_neighbors, pitch_neighbors,
    population_filter,
};

/// Build a catalog entry with a dummy archive path
fn entry(instrument: &str, note: i32, fcode: &str) -> CatalogEntry {
    CatalogEntry {
        features: PathBuf::from(format!("{}_{}_{}.npz", instrument, note, fcode)),
        prediction: None,
        instrument: instrument.to_string(),
        note_number: note,
        fcode: fcode.to_string(),
    }
}

/// A small mixed catalog: two instruments, overlapping note ranges
fn toy_catalog() -> Catalog {
    Catalog::from_entries(vec![
        entry("VI", 60, "a"),
        entry("VI", 61, "b"),
        entry("VI", 64, "c"),
        entry("KLB", 60, "a"),
        entry("KLB", 62, "b"),
        entry("TR", 72, "a"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_instrument_neighbors_partition() {
        let catalog = toy_catalog();
        let neighbors = instrument_neighbors(&catalog);

        assert_eq!(neighbors.len(), 3, "one bucket per instrument code");

        // Union of bucket members equals the full key set
        let mut seen = BTreeSet::new();
        for members in neighbors.values() {
            for key in members {
                assert!(
                    seen.insert(key.clone()),
                    "key '{}' appears in more than one instrument bucket",
                    key
                );
            }
        }
        let all: BTreeSet<String> = catalog.keys().cloned().collect();
        assert_eq!(seen, all, "instrument buckets must partition the catalog");
    }

    #[test]
    fn test_pitch_neighbors_group_by_note() {
        let catalog = toy_catalog();
        let neighbors = pitch_neighbors(&catalog);

        assert_eq!(
            neighbors.get("60").map(|m| m.len()),
            Some(2),
            "note 60 appears under two instruments"
        );
        assert_eq!(neighbors.get("72").map(|m| m.len()), Some(1));
        assert!(!neighbors.contains_key("59"), "absent notes form no bucket");
    }

    #[test]
    fn test_instrument_pitch_zero_delta_is_exact_match() {
        let catalog = toy_catalog();
        let neighbors = instrument_pitch_neighbors(&catalog, 0, 0);

        // With pitch_delta = 0 each bucket is the instrument x pitch
        // equality-filtered subset.
        for (key, members) in &neighbors {
            for member in members {
                let entry = catalog.get(member).unwrap();
                assert_eq!(
                    key,
                    &entry.inst_note(),
                    "member '{}' outside exact-match bucket '{}'",
                    member,
                    key
                );
            }
        }
        assert_eq!(neighbors.get("VI_60").map(|m| m.len()), Some(1));
    }

    #[test]
    fn test_instrument_pitch_window_membership() {
        let catalog = toy_catalog();
        let neighbors = instrument_pitch_neighbors(&catalog, 1, 0);

        // VI_60 with delta 1 pulls in VI note 61 but not VI note 64
        let members = neighbors.get("VI_60").expect("VI_60 bucket must exist");
        assert_eq!(members.len(), 2, "window of +/-1 around 60 holds 60 and 61");
        assert!(members.iter().all(|k| k.starts_with("VI_")));
    }

    #[test]
    fn test_instrument_pitch_population_threshold_is_strict() {
        let catalog = toy_catalog();

        // Every exact-match bucket has population 1; a strictly-greater-than
        // threshold of 1 must drop them all.
        let neighbors = instrument_pitch_neighbors(&catalog, 0, 1);
        assert!(
            neighbors.is_empty(),
            "population == min_population must be dropped (strict threshold)"
        );

        // With threshold 0, population-1 buckets survive.
        let neighbors = instrument_pitch_neighbors(&catalog, 0, 0);
        assert!(!neighbors.is_empty());
    }

    #[test]
    fn test_population_filter_inclusive_boundary() {
        let catalog = toy_catalog();
        let neighbors = instrument_neighbors(&catalog);
        // Bucket sizes: VI=3, KLB=2, TR=1

        let filtered = population_filter(neighbors.clone(), 2);
        assert!(
            filtered.contains_key("KLB"),
            "population == cutoff is retained by population_filter"
        );
        assert!(filtered.contains_key("VI"));
        assert!(
            !filtered.contains_key("TR"),
            "population < cutoff is dropped"
        );

        let unfiltered = population_filter(neighbors, 0);
        assert_eq!(unfiltered.len(), 3);
    }

    #[test]
    fn test_build_neighbors_dispatch() {
        let catalog = toy_catalog();

        let by_mode = build_neighbors(&catalog, &NeighborMode::Instrument);
        assert_eq!(by_mode, instrument_neighbors(&catalog));

        let by_mode = build_neighbors(&catalog, &NeighborMode::Pitch);
        assert_eq!(by_mode, pitch_neighbors(&catalog));

        let by_mode = build_neighbors(
            &catalog,
            &NeighborMode::InstrumentPitch {
                pitch_delta: 1,
                min_population: 0,
            },
        );
        assert_eq!(by_mode, instrument_pitch_neighbors(&catalog, 1, 0));
    }
}
