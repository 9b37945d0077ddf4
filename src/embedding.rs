//! Embedding-coordinate streams for evaluation sampling

use crate::catalog::Catalog;
use crate::config::EmbeddingConfig;
use crate::error::{Result, SampleError};
use crate::mux::Mux;
use crate::slices::{ObsMeta, SlicePlan};
use crate::stream::session_rng;
use ndarray::{aview1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Multiplexed stream over every catalog entry's embedding archive.
///
/// No neighborhood structure; all entries form one candidate pool.
pub fn create_embedding_stream<'a>(
    catalog: &'a Catalog,
    config: &EmbeddingConfig,
) -> Result<Mux<'a>> {
    let mut rng = session_rng(config.seed);
    let candidates: Vec<String> = catalog.keys().cloned().collect();
    Mux::new(
        catalog,
        "embedding",
        candidates,
        SlicePlan::Embedding {
            n_length: config.n_length,
        },
        config.working_size,
        config.lam,
        StdRng::from_rng(&mut rng),
    )
}

/// Draw a fixed number of i.i.d. embedding points with their labels.
///
/// Row width is taken from the first drawn observation rather than assumed,
/// so any embedding dimensionality works.
pub fn sample_embeddings(
    catalog: &Catalog,
    num_points: usize,
    config: &EmbeddingConfig,
) -> Result<(Array2<f32>, Vec<ObsMeta>)> {
    let mut stream = create_embedding_stream(catalog, config)?;
    let mut labels = Vec::with_capacity(num_points);
    let mut data: Option<Array2<f32>> = None;

    for n in 0..num_points {
        let obs = stream.draw()?;
        let row: Vec<f32> = obs.data.iter().cloned().collect();

        let buffer = data.get_or_insert_with(|| Array2::zeros((num_points, row.len())));
        if buffer.ncols() != row.len() {
            return Err(SampleError::BatchAssemblyError(format!(
                "embedding width changed from {} to {} at point {}",
                buffer.ncols(),
                row.len(),
                n
            )));
        }
        buffer.row_mut(n).assign(&aview1(&row));
        labels.push(obs.meta);
    }

    Ok((data.unwrap_or_else(|| Array2::zeros((0, 0))), labels))
}
