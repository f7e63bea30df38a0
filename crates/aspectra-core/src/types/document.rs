use crate::error::{AspectraError, Result};
use crate::text::{Token, align, detokenize_with_offsets};

/// One tagged document: the text plus the external model's per-token labels.
///
/// Tokens are ordered, lie on character boundaries of `text` and never
/// overlap. Labels are kept as the raw strings the model produced; the
/// span reconstructor resolves them against a tag scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: Option<String>,
    text: String,
    tokens: Vec<Token>,
    labels: Vec<String>,
}

impl Document {
    /// Builds a document from tokens that already carry byte offsets.
    ///
    /// # Errors
    ///
    /// Returns `AspectraError::InvalidDocument` if token and label counts
    /// differ, or if a token range is out of bounds, not on a character
    /// boundary, or overlaps its predecessor.
    pub fn new(text: impl Into<String>, mut tokens: Vec<Token>, labels: Vec<String>) -> Result<Self> {
        let text = text.into();
        if tokens.len() != labels.len() {
            return Err(AspectraError::InvalidDocument(format!(
                "{} tokens but {} labels",
                tokens.len(),
                labels.len()
            )));
        }

        let mut prev_end = 0;
        for (i, token) in tokens.iter_mut().enumerate() {
            if token.start > token.end
                || token.end > text.len()
                || !text.is_char_boundary(token.start)
                || !text.is_char_boundary(token.end)
            {
                return Err(AspectraError::InvalidDocument(format!(
                    "token {i} ({:?}) has invalid range {}..{}",
                    token.text, token.start, token.end
                )));
            }
            if token.start < prev_end {
                return Err(AspectraError::InvalidDocument(format!(
                    "token {i} ({:?}) overlaps the previous token",
                    token.text
                )));
            }
            prev_end = token.end;
            token.index = i;
        }

        Ok(Self {
            id: None,
            text,
            tokens,
            labels,
        })
    }

    /// Builds a document from bare words, rebuilding the text by
    /// detokenization.
    ///
    /// # Errors
    ///
    /// Returns `AspectraError::InvalidDocument` if word and label counts differ.
    pub fn from_words<S: AsRef<str>>(words: &[S], labels: Vec<String>) -> Result<Self> {
        let (text, offsets) = detokenize_with_offsets(words);
        let tokens = words
            .iter()
            .zip(offsets)
            .enumerate()
            .map(|(i, (word, (start, end)))| Token::new(word.as_ref(), start, end, i))
            .collect();
        Self::new(text, tokens, labels)
    }

    /// Builds a document from bare words by locating them in `text`.
    ///
    /// # Errors
    ///
    /// Returns `AspectraError::InvalidDocument` if word and label counts differ.
    pub fn from_aligned<S: AsRef<str>>(
        text: impl Into<String>,
        words: &[S],
        labels: Vec<String>,
    ) -> Result<Self> {
        let text = text.into();
        let tokens = align(&text, words);
        Self::new(text, tokens, labels)
    }

    /// Attaches an identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterates `(token, label)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&Token, &str)> {
        self.tokens
            .iter()
            .zip(self.labels.iter().map(String::as_str))
    }
}
