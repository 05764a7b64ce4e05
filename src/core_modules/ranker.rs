// THEORY:
// The `ranker` module is the decision layer of the retrieval engine. Given a query
// image and a feature space, it orders the entire corpus by similarity to the query.
//
// Key architectural principles:
// 1.  **One Pass, Then Sort**: The query is compared against every other corpus
//     member exactly once. The resulting distances are sorted with a stable sort,
//     so ties keep corpus order, and images with an infinite distance sink to the
//     bottom without special casing.
// 2.  **Query First**: The query itself is never compared. It is always placed at
//     the head of the order, followed by the rest of the corpus.
// 3.  **No Incremental Re-ranking**: Every call recomputes the full order from
//     scratch. The corpus is static and small, so there is nothing worth caching
//     beyond the corpus statistics the feature store already keeps.
// 4.  **Validation**: Both the "no query selected" and "unknown image" cases are
//     rejected here, even though the shell is expected to guard them.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::core_modules::ImageId;
use crate::core_modules::distance::{
    Distance, manhattan_distance, serialize_distance, standardized_distance,
};
use crate::core_modules::feature_store::FeatureStore;
use crate::error::RetrievalError;

/// The feature space a ranking is computed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetrievalMethod {
    /// 25-bin luma histogram, per-image-normalized Manhattan distance.
    Intensity,
    /// 64-bin color-code histogram, per-image-normalized Manhattan distance.
    ColorCode,
    /// Corpus-standardized 89-dimension combined histogram.
    Combined,
}

impl RetrievalMethod {
    pub const ALL: [RetrievalMethod; 3] = [
        RetrievalMethod::Intensity,
        RetrievalMethod::ColorCode,
        RetrievalMethod::Combined,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RetrievalMethod::Intensity => "intensity",
            RetrievalMethod::ColorCode => "color-code",
            RetrievalMethod::Combined => "combined",
        }
    }
}

impl fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RetrievalMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "intensity" => Ok(RetrievalMethod::Intensity),
            "color-code" | "colorcode" | "color" => Ok(RetrievalMethod::ColorCode),
            "combined" | "both" | "intensity-and-color-code" => Ok(RetrievalMethod::Combined),
            other => Err(format!(
                "unknown retrieval method '{other}' (expected intensity, color-code or combined)"
            )),
        }
    }
}

/// Distance from the query to one corpus image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceEntry {
    pub image_id: ImageId,
    /// In `[0, inf]`; `inf` only for histograms that count no pixels.
    #[serde(serialize_with = "serialize_distance")]
    pub distance: Distance,
}

/// A full ordering of the corpus relative to a query image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedOrder {
    pub query: ImageId,
    pub method: RetrievalMethod,
    /// Every other corpus image, nearest first.
    pub neighbors: Vec<DistanceEntry>,
}

impl RankedOrder {
    /// Permutation of every corpus identifier, query first.
    pub fn ids(&self) -> Vec<ImageId> {
        std::iter::once(self.query)
            .chain(self.neighbors.iter().map(|entry| entry.image_id))
            .collect()
    }

    /// Distance of `id` to the query; 0 for the query itself.
    pub fn distance_to(&self, id: ImageId) -> Option<Distance> {
        if id == self.query {
            return Some(0.0);
        }
        self.neighbors
            .iter()
            .find(|entry| entry.image_id == id)
            .map(|entry| entry.distance)
    }

    pub fn len(&self) -> usize {
        self.neighbors.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Orders the corpus by similarity to `query` in the given feature space.
pub fn rank(
    store: &FeatureStore,
    query: Option<ImageId>,
    method: RetrievalMethod,
) -> Result<RankedOrder, RetrievalError> {
    let query = query.ok_or(RetrievalError::NoQuerySelected)?;
    store.check_id(query)?;

    let mut neighbors = distances_from(store, query, method)?;
    neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    log::info!(
        "Ranked {} images against query {} using the {} method",
        neighbors.len() + 1,
        query,
        method
    );
    if let Some(nearest) = neighbors.first() {
        log::debug!(
            "Nearest neighbor of {} is {} at {:.6}",
            query,
            nearest.image_id,
            nearest.distance
        );
    }

    Ok(RankedOrder {
        query,
        method,
        neighbors,
    })
}

/// Distances from `query` to every other image, in corpus order.
fn distances_from(
    store: &FeatureStore,
    query: ImageId,
    method: RetrievalMethod,
) -> Result<Vec<DistanceEntry>, RetrievalError> {
    let query_set = store.histograms(query)?;
    let others = store.iter().filter(|&(id, _)| id != query);

    let entries = match method {
        RetrievalMethod::Intensity => others
            .map(|(image_id, set)| DistanceEntry {
                image_id,
                distance: manhattan_distance(&query_set.intensity, &set.intensity),
            })
            .collect(),
        RetrievalMethod::ColorCode => others
            .map(|(image_id, set)| DistanceEntry {
                image_id,
                distance: manhattan_distance(&query_set.color_code, &set.color_code),
            })
            .collect(),
        RetrievalMethod::Combined => {
            let statistics = store.statistics();
            let query_normalized = statistics.normalize(&query_set.combined);
            others
                .map(|(image_id, set)| DistanceEntry {
                    image_id,
                    distance: standardized_distance(
                        &query_normalized,
                        &statistics.normalize(&set.combined),
                    ),
                })
                .collect()
        }
    };
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::histogram::{CombinedHistogram, HistogramSet, IntensityHistogram};
    use image::{DynamicImage, Rgb, RgbImage};

    fn solid(rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 4, Rgb(rgb)))
    }

    fn half_and_half(left: [u8; 3], right: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(8, 4, |x, _| {
            if x < 4 { Rgb(left) } else { Rgb(right) }
        }))
    }

    #[test]
    fn query_is_always_first() {
        let store = FeatureStore::load([
            solid([0, 0, 0]),
            solid([90, 90, 90]),
            solid([250, 250, 250]),
        ])
        .unwrap();
        for method in RetrievalMethod::ALL {
            for query in store.ids() {
                let order = rank(&store, Some(query), method).unwrap();
                let ids = order.ids();
                assert_eq!(ids[0], query);
                assert_eq!(ids.len(), store.len());
                let mut sorted = ids.clone();
                sorted.sort();
                assert_eq!(sorted, vec![1, 2, 3]);
            }
        }
    }

    #[test]
    fn identical_colors_rank_together() {
        let store = FeatureStore::load([
            solid([200, 30, 30]),
            solid([200, 30, 30]),
            solid([20, 30, 200]),
        ])
        .unwrap();
        let order = rank(&store, Some(1), RetrievalMethod::ColorCode).unwrap();
        assert_eq!(order.ids(), vec![1, 2, 3]);
        assert_eq!(order.distance_to(2), Some(0.0));
        assert_eq!(order.distance_to(3), Some(2.0));
    }

    #[test]
    fn nearer_images_rank_higher() {
        let store = FeatureStore::load([
            solid([250, 250, 250]),
            solid([0, 0, 0]),
            half_and_half([0, 0, 0], [250, 250, 250]),
            solid([252, 252, 252]),
        ])
        .unwrap();
        let order = rank(&store, Some(1), RetrievalMethod::Intensity).unwrap();
        assert_eq!(order.ids(), vec![1, 4, 3, 2]);
        assert!(order.neighbors.windows(2).all(|pair| pair[0].distance <= pair[1].distance));
    }

    #[test]
    fn ties_keep_corpus_order() {
        let store = FeatureStore::load([
            solid([10, 10, 10]),
            solid([120, 120, 120]),
            solid([60, 200, 60]),
            solid([120, 120, 120]),
            solid([60, 200, 60]),
        ])
        .unwrap();
        let order = rank(&store, Some(1), RetrievalMethod::ColorCode).unwrap();
        // Every other image sits in a different cell than the query, so all tie at 2.0.
        assert_eq!(order.ids(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn identical_corpus_ranks_in_corpus_order_under_combined() {
        let store = FeatureStore::load(vec![solid([77, 140, 20]); 5]).unwrap();
        let order = rank(&store, Some(3), RetrievalMethod::Combined).unwrap();
        assert_eq!(order.ids(), vec![3, 1, 2, 4, 5]);
        assert!(order.neighbors.iter().all(|entry| entry.distance == 0.0));
    }

    #[test]
    fn degenerate_histograms_sink_to_the_bottom() {
        let full = |bin: usize| {
            let mut bins = [0; 25];
            bins[bin] = 10;
            IntensityHistogram::from_bins(bins)
        };
        let set = |intensity: IntensityHistogram| HistogramSet {
            combined: CombinedHistogram::from_parts(&intensity, &Default::default()),
            color_code: Default::default(),
            intensity,
        };
        let store = FeatureStore::from_histograms(vec![
            set(full(3)),
            set(IntensityHistogram::default()),
            set(full(20)),
            set(full(3)),
        ])
        .unwrap();

        let order = rank(&store, Some(1), RetrievalMethod::Intensity).unwrap();
        assert_eq!(order.ids(), vec![1, 4, 3, 2]);
        assert_eq!(order.distance_to(2), Some(f64::INFINITY));

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["neighbors"][0]["distance"], serde_json::json!(0.0));
        assert_eq!(json["neighbors"][2]["image_id"], serde_json::json!(2));
        assert_eq!(json["neighbors"][2]["distance"], serde_json::json!("inf"));
    }

    #[test]
    fn missing_or_unknown_query_is_rejected() {
        let store = FeatureStore::load([solid([1, 1, 1]), solid([2, 2, 2])]).unwrap();
        assert!(matches!(
            rank(&store, None, RetrievalMethod::Intensity),
            Err(RetrievalError::NoQuerySelected)
        ));
        assert!(matches!(
            rank(&store, Some(0), RetrievalMethod::Combined),
            Err(RetrievalError::UnknownImage { id: 0, corpus_size: 2 })
        ));
        assert!(matches!(
            rank(&store, Some(3), RetrievalMethod::ColorCode),
            Err(RetrievalError::UnknownImage { id: 3, corpus_size: 2 })
        ));
    }

    #[test]
    fn single_image_corpus_ranks_only_the_query() {
        let store = FeatureStore::load([solid([5, 5, 5])]).unwrap();
        let order = rank(&store, Some(1), RetrievalMethod::Combined).unwrap();
        assert_eq!(order.ids(), vec![1]);
        assert!(order.neighbors.is_empty());
    }

    #[test]
    fn methods_parse_from_their_names() {
        for method in RetrievalMethod::ALL {
            assert_eq!(method.name().parse::<RetrievalMethod>(), Ok(method));
        }
        assert_eq!("Color_Code".parse::<RetrievalMethod>(), Ok(RetrievalMethod::ColorCode));
        assert!("texture".parse::<RetrievalMethod>().is_err());
    }
}
