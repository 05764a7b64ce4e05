// THEORY:
// The `error` module holds the full failure taxonomy of the retrieval engine.
// Every engine operation is request/response and runs against a static, local
// corpus, so there is nothing transient to retry: each error is terminal for the
// operation that raised it and is handed back to the presentation shell, which
// turns it into a user-visible message.
//
// The taxonomy is layered the same way the engine is:
// 1.  **InvalidImageError**: a single raster could not be turned into histograms
//     (it failed to decode, or it occupies zero area).
// 2.  **CorpusLoadError**: the corpus as a whole could not be built. Loading is
//     all-or-nothing; one bad image aborts the load.
// 3.  **RetrievalError**: the umbrella type returned by the public API, adding the
//     two query-time failures (no query selected, identifier out of range). An
//     invalid image only ever reaches it inside a `CorpusLoadError`.

use std::path::PathBuf;

use thiserror::Error;

use crate::core_modules::ImageId;

/// A raster that cannot be turned into histograms.
#[derive(Error, Debug)]
pub enum InvalidImageError {
    /// The raster has no pixels, so no distribution can be built from it.
    #[error("image has zero area ({width}x{height})")]
    ZeroArea { width: u32, height: u32 },

    /// The bytes could not be decoded into a raster.
    #[error("image could not be decoded: {0}")]
    Undecodable(#[from] image::ImageError),
}

/// The corpus could not be built. No partial corpus is ever produced.
#[derive(Error, Debug)]
pub enum CorpusLoadError {
    #[error("corpus contains no images")]
    Empty,

    #[error("corpus image {id} is missing at {}", path.display())]
    MissingImage { id: ImageId, path: PathBuf },

    #[error("corpus image {id} could not be read from {}: {source}", path.display())]
    Unreadable {
        id: ImageId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Extraction failed for one image of the corpus.
    #[error("corpus image {id} is invalid: {source}")]
    Image {
        id: ImageId,
        #[source]
        source: InvalidImageError,
    },
}

/// Errors returned by the public retrieval API.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error(transparent)]
    CorpusLoad(#[from] CorpusLoadError),

    /// Ranking was requested before any query image was selected.
    #[error("no query image selected")]
    NoQuerySelected,

    /// The identifier does not name an image of the loaded corpus.
    #[error("image {id} is outside the corpus range 1..={corpus_size}")]
    UnknownImage { id: ImageId, corpus_size: usize },
}
