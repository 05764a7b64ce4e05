// THEORY:
// This file is the main entry point for the `chroma_retrieval` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (like a browsing shell).
//
// The primary goal is to export the `RetrievalEngine` and its associated data
// structures (`RetrievalConfig`, `RankedOrder`, `SelectionState`, etc.) as the
// high-level interface of the engine. The `core_modules` tree holds the building
// blocks: pixel heuristics, histogram extraction, distances, corpus statistics,
// the feature store, the ranker and the browsing state.

pub mod core_modules;
pub mod corpus;
pub mod error;
pub mod retrieval;
