//! # Aspectra Core
//!
//! The engine behind Aspectra: turns per-token BIO labels produced by a
//! sequence tagger into scientific aspects (tasks, contributions, methods,
//! conclusions), normalizes them into deduplicated canonical phrases,
//! renders them, and scores predictions against gold annotations.
//!
//! ## Quick Start
//!
//! ```rust
//! use aspectra_core::{AspectExtractor, Document};
//!
//! let extractor = AspectExtractor::with_defaults();
//! let doc = Document::from_words(
//!     &["Предложен", "метод", "SPH", "и", "метод", "SPH", "(", "частиц", ")"],
//!     ["O", "B-METHOD", "I-METHOD", "O", "B-METHOD", "I-METHOD", "I-METHOD", "I-METHOD", "I-METHOD"]
//!         .iter()
//!         .map(|s| s.to_string())
//!         .collect(),
//! )
//! .unwrap();
//!
//! let extraction = extractor.extract_document(&doc);
//! assert_eq!(extraction.spans.len(), 2);
//! assert_eq!(
//!     extraction.aspects.texts("METHOD"),
//!     ["Метод SPH (частиц)"]
//! );
//! ```
pub mod config;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod neural;
pub mod render;
pub mod scheme;
pub mod text;
pub mod types;

// Re-export primary API
pub use config::{ExtractorConfig, MarkerStyle};
pub use error::{AspectraError, Result};
pub use extract::{
    AspectExtractor, AspectNormalizer, Extraction, ReconstructionReport, SequenceTagger,
    SpanReconstructor,
};
pub use metrics::{Evaluator, MetricsReport};
pub use neural::NeuralTagger;
pub use render::Renderer;
pub use scheme::{Category, CategoryDef, CategoryId, Color, Tag, TagScheme};
pub use text::{Token, Tokenizer};
pub use types::{Aspect, AspectGroup, AspectGroups, Document, Mention, Span};
