//! Tests for filename parsing, directory indexing, and catalog partitioning

use ndarray::Array2;
use ndarray_npy::NpzWriter;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::path::{Path, PathBuf};
use timbre_stream::catalog::parse_filename;
use timbre_stream::{index_directory, SampleError};

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "timbre-stream-catalog-{}-{}",
        tag,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_archive(dir: &Path, name: &str) {
    let data = Array2::<f32>::ones((4, 6));
    let mut npz = NpzWriter::new(File::create(dir.join(name)).unwrap());
    npz.add_array("cqt", &data).unwrap();
    npz.finish().unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filename_splits_components() {
        let (instrument, note, fcode) =
            parse_filename(Path::new("/data/VI_60_a.npz"), '_').unwrap();
        assert_eq!(instrument, "VI");
        assert_eq!(note, 60);
        assert_eq!(fcode, "a");

        // Trailing fields beyond the first three are ignored
        let (instrument, note, fcode) =
            parse_filename(Path::new("KLB_48_b_extra.npz"), '_').unwrap();
        assert_eq!((instrument.as_str(), note, fcode.as_str()), ("KLB", 48, "b"));
    }

    #[test]
    fn test_parse_filename_rejects_malformed_stems() {
        let result = parse_filename(Path::new("VI_60.npz"), '_');
        assert!(matches!(result, Err(SampleError::FilenameParseError(_))));

        let result = parse_filename(Path::new("VI_sixty_a.npz"), '_');
        assert!(
            matches!(result, Err(SampleError::FilenameParseError(_))),
            "non-numeric note numbers are a parse error"
        );
    }

    #[test]
    fn test_index_directory_builds_keyed_catalog() {
        let dir = scratch_dir("index");
        write_archive(&dir, "VI_60_a.npz");
        write_archive(&dir, "VI_64_b.npz");
        write_archive(&dir, "KLB_60_a.npz");
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let catalog = index_directory(&dir, None, '_').unwrap();
        assert_eq!(catalog.len(), 3, "only .npz files are indexed");

        let entry = catalog.get("VI_60_a").unwrap();
        assert_eq!(entry.instrument, "VI");
        assert_eq!(entry.note_number, 60);
        assert_eq!(entry.inst_note(), "VI_60");
        assert!(entry.prediction.is_none());

        assert!(matches!(
            catalog.get("absent"),
            Err(SampleError::UnknownCatalogEntry(_))
        ));
    }

    #[test]
    fn test_index_directory_records_prediction_siblings() {
        let features = scratch_dir("feat");
        let predictions = scratch_dir("pred");
        write_archive(&features, "VI_60_a.npz");
        write_archive(&features, "VI_64_b.npz");
        // Only one entry has a matching prediction archive
        write_archive(&predictions, "VI_60_a.npz");

        let catalog = index_directory(&features, Some(&predictions), '_').unwrap();
        assert!(catalog.get("VI_60_a").unwrap().prediction.is_some());
        assert!(catalog.get("VI_64_b").unwrap().prediction.is_none());
    }

    #[test]
    fn test_index_missing_directory_fails() {
        let result = index_directory(Path::new("/nonexistent/features"), None, '_');
        assert!(matches!(result, Err(SampleError::CatalogIndexError(_))));
    }

    #[test]
    fn test_split_partitions_disjointly() {
        let dir = scratch_dir("split");
        for name in [
            "VI_60_a.npz",
            "VI_61_b.npz",
            "VI_62_c.npz",
            "KLB_60_a.npz",
            "KLB_61_b.npz",
            "KLB_62_c.npz",
        ] {
            write_archive(&dir, name);
        }
        let catalog = index_directory(&dir, None, '_').unwrap();

        let mut rng = StdRng::seed_from_u64(33);
        let (train, test) = catalog.split(0.5, &mut rng);
        assert_eq!(train.len(), 3);
        assert_eq!(test.len(), 3);
        for key in train.keys() {
            assert!(
                test.get(key).is_err(),
                "'{}' must not appear in both partitions",
                key
            );
        }
    }
}
