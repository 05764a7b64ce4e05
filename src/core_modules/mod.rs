pub mod corpus_statistics;
pub mod distance;
pub mod feature_store;
pub mod histogram;
pub mod pixel;
pub mod ranker;
pub mod selection;

/// Stable 1-based identifier of a corpus image (`1..=N`).
pub type ImageId = usize;
