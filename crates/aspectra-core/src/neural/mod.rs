//! # Neural Sequence Tagging
//!
//! DistilBERT token classification with constrained Viterbi decoding.

pub mod model;
pub mod tagger;
pub mod viterbi;

pub use model::TokenClassifier;
pub use tagger::NeuralTagger;
pub use viterbi::ViterbiDecoder;
