//! # Extraction Pipeline
//!
//! Wires the tag scheme, span reconstructor and aspect normalizer together
//! for one document or a batch of documents.

use rayon::prelude::*;
use serde::Serialize;

use crate::config::ExtractorConfig;
use crate::error::Result;
use crate::extract::normalize::{AspectNormalizer, NormalizerOptions};
use crate::extract::reconstruct::{ReconstructionReport, SpanReconstructor};
use crate::render::Renderer;
use crate::scheme::TagScheme;
use crate::types::{AspectGroups, Document, Mention, Span};

/// Anything that turns raw text into a tagged document: the external model.
pub trait SequenceTagger {
    /// Tokenizes and tags `text`.
    ///
    /// # Errors
    ///
    /// Implementations return an error when inference fails.
    fn tag(&self, text: &str) -> Result<Document>;
}

/// Everything extracted from one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    /// Identifier of the source document, if it had one.
    pub id: Option<String>,
    pub spans: Vec<Span>,
    pub aspects: AspectGroups,
    pub report: ReconstructionReport,
}

impl Extraction {
    /// Span triples for colorization and evaluation.
    pub fn mentions(&self) -> Vec<Mention> {
        self.spans.iter().map(Span::mention).collect()
    }
}

/// The aspect extraction pipeline.
#[derive(Debug, Clone)]
pub struct AspectExtractor {
    config: ExtractorConfig,
    scheme: TagScheme,
}

impl AspectExtractor {
    /// Create a new extractor with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `AspectraError::InvalidConfig` if the configuration or its
    /// category list is invalid.
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        config.validate()?;
        let scheme = TagScheme::new(&config.categories)?;
        tracing::debug!(categories = scheme.categories().len(), "extractor ready");
        Ok(Self { config, scheme })
    }

    /// Create a new extractor with default configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: ExtractorConfig::default(),
            scheme: TagScheme::default(),
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn scheme(&self) -> &TagScheme {
        &self.scheme
    }

    /// Renderer bound to this extractor's scheme and marker style.
    pub fn renderer(&self) -> Renderer<'_> {
        Renderer::new(&self.scheme, self.config.marker)
    }

    /// Reconstructs and normalizes the aspects of one tagged document.
    ///
    /// # Examples
    /// ```
    /// use aspectra_core::{AspectExtractor, Document};
    ///
    /// let extractor = AspectExtractor::with_defaults();
    /// let doc = Document::from_words(
    ///     &["Восстановление", "коэффициентов", "системы"],
    ///     vec!["B-TASK".into(), "I-TASK".into(), "I-TASK".into()],
    /// )
    /// .unwrap();
    ///
    /// let extraction = extractor.extract_document(&doc);
    /// assert_eq!(
    ///     extraction.aspects.texts("TASK"),
    ///     ["Восстановление коэффициентов системы"]
    /// );
    /// ```
    pub fn extract_document(&self, doc: &Document) -> Extraction {
        let (spans, report) = SpanReconstructor::new(&self.scheme).reconstruct(doc);
        let aspects =
            AspectNormalizer::new(&self.scheme, NormalizerOptions::from(&self.config)).normalize(&spans);

        Extraction {
            id: doc.id().map(str::to_string),
            spans,
            aspects,
            report,
        }
    }

    /// Tags raw text with `tagger`, then extracts its aspects.
    ///
    /// # Errors
    ///
    /// Propagates the tagger's error.
    pub fn extract_text(&self, text: &str, tagger: &dyn SequenceTagger) -> Result<Extraction> {
        let doc = tagger.tag(text)?;
        Ok(self.extract_document(&doc))
    }

    /// Extracts every document in parallel. Output order matches input order.
    pub fn extract_batch(&self, docs: &[Document]) -> Vec<Extraction> {
        docs.par_iter().map(|doc| self.extract_document(doc)).collect()
    }
}
