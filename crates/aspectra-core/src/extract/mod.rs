pub mod normalize;
pub mod pipeline;
pub mod reconstruct;

pub use normalize::{AspectNormalizer, NormalizerOptions};
pub use pipeline::{AspectExtractor, Extraction, SequenceTagger};
pub use reconstruct::{ReconstructionReport, SpanReconstructor};
