// THEORY:
// The `retrieval` module is the top-level API of the engine. It wires the corpus
// loader, the feature store and the ranker into one value that a presentation
// shell can hold on to, and re-exports the data types that shell needs.
//
// The engine itself is immutable once built. Browsing state is not kept here: the
// shell owns a `SelectionState` and passes it in, so the same engine can serve any
// number of independent browsing sessions.

use std::path::{Path, PathBuf};

use crate::core_modules::feature_store::FeatureStore;
use crate::core_modules::ranker::rank;
use crate::corpus::CorpusDirectory;
use crate::error::RetrievalError;

// Re-export key data structures for the public API.
pub use crate::core_modules::ImageId;
pub use crate::core_modules::corpus_statistics::{CorpusStatistics, NormalizedHistogram};
pub use crate::core_modules::histogram::{
    ColorCodeHistogram, CombinedHistogram, HistogramSet, IntensityHistogram,
};
pub use crate::core_modules::ranker::{DistanceEntry, RankedOrder, RetrievalMethod};
pub use crate::core_modules::selection::{
    MIN_IMAGES_PER_PAGE, PageEntry, PageView, SelectionState,
};

/// The size of the corpus the engine was originally built around.
pub const DEFAULT_CORPUS_SIZE: usize = 100;

/// Configuration for the RetrievalEngine and the browsing shell around it.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Directory holding `1.<extension>` .. `N.<extension>`.
    pub image_folder: PathBuf,
    /// Image file extension, without the leading dot.
    pub extension: String,
    /// Number of corpus images. `None` discovers the contiguous run of files.
    pub corpus_size: Option<usize>,
    /// Images shown per page; raised to `MIN_IMAGES_PER_PAGE` if smaller.
    pub images_per_page: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            image_folder: PathBuf::from("images"),
            extension: "jpg".to_string(),
            corpus_size: Some(DEFAULT_CORPUS_SIZE),
            images_per_page: MIN_IMAGES_PER_PAGE,
        }
    }
}

/// The main, top-level struct for the retrieval engine.
pub struct RetrievalEngine {
    config: RetrievalConfig,
    directory: CorpusDirectory,
    store: FeatureStore,
}

impl RetrievalEngine {
    /// Loads the corpus described by `config`. Any missing or invalid image fails the load.
    pub fn open(config: RetrievalConfig) -> Result<Self, RetrievalError> {
        let directory = CorpusDirectory::new(&config.image_folder, config.extension.clone());
        let store = directory.load(config.corpus_size)?;
        Ok(Self {
            config,
            directory,
            store,
        })
    }

    /// Wraps an already-built feature store, naming images after `config`.
    pub fn from_store(config: RetrievalConfig, store: FeatureStore) -> Self {
        let directory = CorpusDirectory::new(&config.image_folder, config.extension.clone());
        Self {
            config,
            directory,
            store,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    pub fn corpus_size(&self) -> usize {
        self.store.len()
    }

    /// A fresh browsing session over this corpus.
    pub fn new_selection(&self) -> SelectionState {
        SelectionState::new(self.store.len(), self.config.images_per_page)
    }

    pub fn rank(
        &self,
        query: Option<ImageId>,
        method: RetrievalMethod,
    ) -> Result<RankedOrder, RetrievalError> {
        rank(&self.store, query, method)
    }

    /// Ranks against the session's query and replaces its order, back on page 0.
    pub fn retrieve(
        &self,
        selection: &mut SelectionState,
        method: RetrievalMethod,
    ) -> Result<(), RetrievalError> {
        selection.retrieve(&self.store, method)
    }

    pub fn histograms(&self, id: ImageId) -> Result<&HistogramSet, RetrievalError> {
        self.store.histograms(id)
    }

    pub fn statistics(&self) -> &CorpusStatistics {
        self.store.statistics()
    }

    pub fn normalized_histogram(&self, id: ImageId) -> Result<NormalizedHistogram, RetrievalError> {
        self.store.normalized_histogram(id)
    }

    pub fn file_name(&self, id: ImageId) -> String {
        self.directory.file_name(id)
    }

    pub fn image_path(&self, id: ImageId) -> PathBuf {
        self.directory.image_path(id)
    }

    pub fn image_folder(&self) -> &Path {
        self.directory.folder()
    }

    /// Renders the session's current page with this corpus' file names.
    pub fn page_view(&self, selection: &SelectionState) -> PageView {
        selection.current_page(|id| self.file_name(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CorpusLoadError;
    use image::{DynamicImage, Rgb, RgbImage};

    fn engine(shades: &[u8]) -> RetrievalEngine {
        let images = shades.iter().map(|&shade| {
            let rgb = Rgb([shade, shade / 2, 255 - shade]);
            DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, rgb))
        });
        let store = FeatureStore::load(images).unwrap();
        RetrievalEngine::from_store(RetrievalConfig::default(), store)
    }

    #[test]
    fn default_config_matches_the_classic_corpus_layout() {
        let config = RetrievalConfig::default();
        assert_eq!(config.image_folder, PathBuf::from("images"));
        assert_eq!(config.extension, "jpg");
        assert_eq!(config.corpus_size, Some(100));
        assert_eq!(config.images_per_page, 20);
    }

    #[test]
    fn open_fails_fast_on_a_missing_folder() {
        let config = RetrievalConfig {
            image_folder: PathBuf::from("/nonexistent/corpus"),
            corpus_size: Some(3),
            ..RetrievalConfig::default()
        };
        assert!(matches!(
            RetrievalEngine::open(config),
            Err(RetrievalError::CorpusLoad(CorpusLoadError::MissingImage { id: 1, .. }))
        ));
    }

    #[test]
    fn retrieve_drives_a_browsing_session() {
        let engine = engine(&[0, 250, 10, 240]);
        let mut selection = engine.new_selection();
        selection.select_query(2);
        engine.retrieve(&mut selection, RetrievalMethod::ColorCode).unwrap();

        let view = engine.page_view(&selection);
        assert_eq!(view.query, Some(2));
        let ids: Vec<_> = view.entries.iter().map(|entry| entry.image_id).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
        assert_eq!(view.entries[0].file_name, "2.jpg");
        assert_eq!(view.entries[1].distance, Some(0.0));
    }

    #[test]
    fn histogram_accessor_validates_ids() {
        let engine = engine(&[0, 128]);
        assert_eq!(engine.histograms(1).unwrap().pixel_count(), 9);
        assert!(matches!(
            engine.histograms(3),
            Err(RetrievalError::UnknownImage { id: 3, corpus_size: 2 })
        ));
        assert!(engine.normalized_histogram(2).is_ok());
    }
}
