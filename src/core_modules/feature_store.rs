// THEORY:
// The `FeatureStore` is the memory of the retrieval engine. It owns the histograms of
// every corpus image and is the only component the ranker reads from.
//
// Key architectural principles:
// 1.  **Built Once, Never Mutated**: The store is built at startup by running the
//     extractor once per image, and is immutable afterwards. The corpus is static,
//     so nothing in the store ever needs to be invalidated.
// 2.  **All-or-Nothing Loading**: If any image fails extraction, the whole load
//     fails. A partial corpus would silently skew every ranking and every statistic.
// 3.  **Lazy Corpus Statistics**: The combined ranking needs corpus-wide statistics.
//     They are learned on first use and cached for the lifetime of the store, which
//     is safe because the histograms they are learned from never change.
// 4.  **Identifier Addressing**: Images are addressed by their stable 1-based
//     identifier. Every lookup validates the identifier against `1..=N`.

use std::borrow::Borrow;
use std::ops::RangeInclusive;
use std::sync::OnceLock;

use image::DynamicImage;

use crate::core_modules::ImageId;
use crate::core_modules::corpus_statistics::{CorpusStatistics, NormalizedHistogram};
use crate::core_modules::histogram::HistogramSet;
use crate::error::{CorpusLoadError, RetrievalError};

/// Immutable per-image features of a loaded corpus.
#[derive(Debug)]
pub struct FeatureStore {
    /// Histograms in corpus order; image `id` lives at index `id - 1`.
    histograms: Vec<HistogramSet>,
    statistics: OnceLock<CorpusStatistics>,
}

impl FeatureStore {
    /// Extracts the features of every image, in corpus order.
    ///
    /// The first image becomes identifier 1. Fails on the first image that cannot
    /// be extracted, or when the sequence is empty.
    pub fn load<I>(images: I) -> Result<Self, CorpusLoadError>
    where
        I: IntoIterator,
        I::Item: Borrow<DynamicImage>,
    {
        let histograms = images
            .into_iter()
            .enumerate()
            .map(|(index, image)| {
                let id = index + 1;
                HistogramSet::extract(image.borrow())
                    .map_err(|source| CorpusLoadError::Image { id, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_histograms(histograms)
    }

    /// Wraps already-extracted histograms, in corpus order.
    pub fn from_histograms(histograms: Vec<HistogramSet>) -> Result<Self, CorpusLoadError> {
        if histograms.is_empty() {
            return Err(CorpusLoadError::Empty);
        }
        log::info!("Feature store holds {} images", histograms.len());
        Ok(Self {
            histograms,
            statistics: OnceLock::new(),
        })
    }

    /// Number of images in the corpus (N).
    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    /// Every identifier of the corpus, in corpus order.
    pub fn ids(&self) -> RangeInclusive<ImageId> {
        1..=self.len()
    }

    /// Fails with `UnknownImage` unless `id` is in `1..=N`.
    pub fn check_id(&self, id: ImageId) -> Result<(), RetrievalError> {
        if self.ids().contains(&id) {
            Ok(())
        } else {
            Err(RetrievalError::UnknownImage {
                id,
                corpus_size: self.len(),
            })
        }
    }

    /// The three histograms of image `id`.
    pub fn histograms(&self, id: ImageId) -> Result<&HistogramSet, RetrievalError> {
        self.check_id(id)?;
        Ok(&self.histograms[id - 1])
    }

    /// Iterates `(id, histograms)` in corpus order.
    pub fn iter(&self) -> impl Iterator<Item = (ImageId, &HistogramSet)> + '_ {
        self.histograms.iter().enumerate().map(|(index, set)| (index + 1, set))
    }

    /// Corpus mean and spread of the combined histograms, learned on first use.
    pub fn statistics(&self) -> &CorpusStatistics {
        self.statistics.get_or_init(|| {
            CorpusStatistics::from_histograms(self.histograms.iter().map(|set| &set.combined))
        })
    }

    /// The combined histogram of image `id`, standardized against the corpus.
    pub fn normalized_histogram(&self, id: ImageId) -> Result<NormalizedHistogram, RetrievalError> {
        let set = self.histograms(id)?;
        Ok(self.statistics().normalize(&set.combined))
    }

    /// Standardized combined histograms of every image, in corpus order.
    pub fn normalized_histograms(&self) -> Vec<NormalizedHistogram> {
        let statistics = self.statistics();
        self.histograms
            .iter()
            .map(|set| statistics.normalize(&set.combined))
            .collect()
    }
}
