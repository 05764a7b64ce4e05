// THEORY:
// The `corpus_statistics` module learns what a "typical" image of the corpus looks
// like in the combined feature space, so that the combined ranking can compare
// images on equal footing across all 89 dimensions.
//
// The intensity half and the color-code half of a combined histogram have very
// different scales: a handful of color cells hold most of the mass, while dozens
// of cells are nearly always empty. Standardizing every dimension by its corpus
// mean and spread (a Z-score) keeps any one dimension from dominating the distance.
//
// Key principles:
// 1.  **Sample Statistics**: The spread is the sample standard deviation (n - 1
//     denominator), computed independently per dimension.
// 2.  **Minimum Informative Spread**: A dimension with no spread cannot be divided
//     by. It is given half of the smallest positive spread seen in any dimension,
//     or 0.5 when no dimension has any spread at all.
// 3.  **Static Corpus**: Statistics depend only on the loaded corpus, which never
//     changes, so they are computed once and reused by every combined ranking.

use crate::core_modules::histogram::{COMBINED_BINS, CombinedHistogram};

/// Spread used when no dimension of the corpus has a positive standard deviation.
const FALLBACK_SPREAD: f64 = 0.5;
/// Fraction of the smallest positive spread given to zero-spread dimensions.
const MINIMUM_SPREAD_FRACTION: f64 = 0.5;

/// A combined histogram standardized against the corpus: `(value - mean) / spread`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedHistogram {
    values: [f64; COMBINED_BINS],
}

impl NormalizedHistogram {
    pub fn from_values(values: [f64; COMBINED_BINS]) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64; COMBINED_BINS] {
        &self.values
    }
}

/// Per-dimension mean and spread of the combined histograms of a corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusStatistics {
    /// The corpus mean of each combined dimension.
    pub mean: [f64; COMBINED_BINS],
    /// The sample standard deviation of each combined dimension.
    pub std_dev: [f64; COMBINED_BINS],
    /// `std_dev` with every non-positive entry replaced by the minimum informative spread.
    pub adjusted_std_dev: [f64; COMBINED_BINS],
}

impl CorpusStatistics {
    /// Learns the statistics from every combined histogram of the corpus.
    ///
    /// With fewer than two histograms the sample spread is undefined and every
    /// dimension is treated as having none.
    pub fn from_histograms<'a, I>(histograms: I) -> Self
    where
        I: IntoIterator<Item = &'a CombinedHistogram>,
        I::IntoIter: Clone,
    {
        let histograms = histograms.into_iter();
        let mut mean = [0.0; COMBINED_BINS];
        let mut count = 0usize;
        for histogram in histograms.clone() {
            for (sum, value) in mean.iter_mut().zip(histogram.values().iter()) {
                *sum += value;
            }
            count += 1;
        }
        if count > 0 {
            for sum in mean.iter_mut() {
                *sum /= count as f64;
            }
        }

        let mut std_dev = [0.0; COMBINED_BINS];
        if count > 1 {
            for histogram in histograms {
                let deviations = histogram
                    .values()
                    .iter()
                    .zip(mean.iter())
                    .map(|(value, center)| value - center);
                for (squares, deviation) in std_dev.iter_mut().zip(deviations) {
                    *squares += deviation.powi(2);
                }
            }
            for squares in std_dev.iter_mut() {
                *squares = (*squares / (count - 1) as f64).sqrt();
            }
        }

        let adjusted_std_dev = Self::adjust_spread(&std_dev);
        log::debug!(
            "Corpus statistics learned from {} images ({} zero-spread dimensions)",
            count,
            std_dev.iter().filter(|&&spread| spread <= 0.0).count()
        );

        Self {
            mean,
            std_dev,
            adjusted_std_dev,
        }
    }

    /// Standardizes a combined histogram against the corpus.
    pub fn normalize(&self, histogram: &CombinedHistogram) -> NormalizedHistogram {
        let mut values = [0.0; COMBINED_BINS];
        for (i, standardized) in values.iter_mut().enumerate() {
            *standardized = (histogram.values()[i] - self.mean[i]) / self.adjusted_std_dev[i];
        }
        NormalizedHistogram { values }
    }

    fn adjust_spread(std_dev: &[f64; COMBINED_BINS]) -> [f64; COMBINED_BINS] {
        let minimum_spread = std_dev
            .iter()
            .copied()
            .filter(|&spread| spread > 0.0)
            .min_by(f64::total_cmp)
            .map_or(FALLBACK_SPREAD, |smallest| MINIMUM_SPREAD_FRACTION * smallest);

        let mut adjusted = *std_dev;
        for spread in adjusted.iter_mut() {
            if *spread <= 0.0 {
                *spread = minimum_spread;
            }
        }
        adjusted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn combined(first: f64, second: f64) -> CombinedHistogram {
        let mut values = [0.0; COMBINED_BINS];
        values[0] = first;
        values[30] = second;
        CombinedHistogram::from_values(values)
    }

    #[test]
    fn mean_and_sample_std_dev_per_dimension() {
        let corpus = [combined(0.2, 1.0), combined(0.4, 1.0), combined(0.6, 1.0)];
        let stats = CorpusStatistics::from_histograms(&corpus);

        assert_relative_eq!(stats.mean[0], 0.4, epsilon = 1e-12);
        assert_relative_eq!(stats.mean[30], 1.0, epsilon = 1e-12);
        // Sample variance of (0.2, 0.4, 0.6) is 0.08 / 2.
        assert_relative_eq!(stats.std_dev[0], 0.04_f64.sqrt(), epsilon = 1e-12);
        assert_eq!(stats.std_dev[30], 0.0);
    }

    #[test]
    fn zero_spread_dimensions_get_half_the_smallest_spread() {
        let corpus = [combined(0.2, 0.0), combined(0.4, 0.0), combined(0.6, 0.0)];
        let stats = CorpusStatistics::from_histograms(&corpus);
        let smallest = stats.std_dev[0];

        assert_relative_eq!(stats.adjusted_std_dev[0], smallest);
        assert_relative_eq!(stats.adjusted_std_dev[30], 0.5 * smallest);
        assert_relative_eq!(stats.adjusted_std_dev[88], 0.5 * smallest);
        assert!(stats.adjusted_std_dev.iter().all(|&spread| spread > 0.0));
    }

    #[test]
    fn identical_corpus_falls_back_to_constant_spread() {
        let corpus = vec![combined(0.25, 0.75); 4];
        let stats = CorpusStatistics::from_histograms(&corpus);

        assert!(stats.std_dev.iter().all(|&spread| spread == 0.0));
        assert!(stats.adjusted_std_dev.iter().all(|&spread| spread == FALLBACK_SPREAD));

        let normalized = stats.normalize(&corpus[0]);
        assert!(normalized.values().iter().all(|&value| value == 0.0));
    }

    #[test]
    fn single_image_corpus_has_no_spread() {
        let corpus = [combined(0.9, 0.1)];
        let stats = CorpusStatistics::from_histograms(&corpus);
        assert!(stats.std_dev.iter().all(|&spread| spread == 0.0));
        assert!(stats.adjusted_std_dev.iter().all(|&spread| spread == FALLBACK_SPREAD));
    }

    #[test]
    fn normalize_produces_z_scores() {
        let corpus = [combined(0.2, 0.5), combined(0.4, 0.5), combined(0.6, 0.5)];
        let stats = CorpusStatistics::from_histograms(&corpus);

        let normalized = stats.normalize(&corpus[2]);
        assert_relative_eq!(normalized.values()[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(normalized.values()[30], 0.0);

        let normalized = stats.normalize(&corpus[1]);
        assert_abs_diff_eq!(normalized.values()[0], 0.0, epsilon = 1e-12);
    }
}
