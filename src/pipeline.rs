//! Embedding generation used by the phrase clusterer's similarity pass.

pub mod embedding;
