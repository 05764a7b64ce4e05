// THEORY:
// The `distance` module provides the comparative analysis of the retrieval engine.
// A histogram on its own says nothing about similarity; its value is in measuring
// how far it sits from another image's histogram.
//
// Two "lenses" are provided, one per feature space:
// - `manhattan_distance`: for raw count histograms (intensity or color-code). Both
//   histograms are first scaled by their own pixel totals, so images of different
//   sizes are compared as distributions. The result lies in [0, 2].
// - `standardized_distance`: for corpus-standardized combined histograms. It is the
//   mean absolute difference across all 89 dimensions.
//
// Degenerate inputs never abort a ranking. A histogram with no counted pixels has
// no distribution, so its distance to anything is `+inf`, which sorts it last.
// JSON has no infinity, so serialized distances spell it out as the string "inf".

use serde::Serializer;

use crate::core_modules::corpus_statistics::NormalizedHistogram;
use crate::core_modules::histogram::{COMBINED_BINS, Histogram};

pub type Distance = f64;

/// Written in place of `+inf` when a distance is serialized.
pub const INFINITE_DISTANCE: &str = "inf";

/// `serialize_with` helper: finite distances as numbers, `+inf` as `"inf"`.
pub fn serialize_distance<S: Serializer>(
    distance: &Distance,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    if distance.is_finite() {
        serializer.serialize_f64(*distance)
    } else {
        serializer.serialize_str(INFINITE_DISTANCE)
    }
}

/// `serialize_with` helper for an optional distance; `None` stays `null`.
pub fn serialize_optional_distance<S: Serializer>(
    distance: &Option<Distance>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match distance {
        Some(distance) => serialize_distance(distance, serializer),
        None => serializer.serialize_none(),
    }
}

/// Manhattan distance between two per-image-normalized histograms.
///
/// Returns `f64::INFINITY` when either histogram counts zero pixels.
pub fn manhattan_distance<const BINS: usize>(a: &Histogram<BINS>, b: &Histogram<BINS>) -> Distance {
    let (total_a, total_b) = (a.total(), b.total());
    if total_a == 0 || total_b == 0 {
        return Distance::INFINITY;
    }
    let (total_a, total_b) = (total_a as f64, total_b as f64);
    a.bins()
        .iter()
        .zip(b.bins().iter())
        .map(|(&count_a, &count_b)| (count_a as f64 / total_a - count_b as f64 / total_b).abs())
        .sum()
}

/// Mean absolute standardized difference over the combined dimensions.
pub fn standardized_distance(a: &NormalizedHistogram, b: &NormalizedHistogram) -> Distance {
    let total: f64 = a
        .values()
        .iter()
        .zip(b.values().iter())
        .map(|(value_a, value_b)| (value_a - value_b).abs())
        .sum();
    total / COMBINED_BINS as f64
}
