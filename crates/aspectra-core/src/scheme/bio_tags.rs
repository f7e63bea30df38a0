//! # BIO Tags for Aspect Tagging
//!
//! Defines the per-token labels used for sequence labeling of aspect
//! phrases. Uses the BIO (Begin-Inside-Outside) tagging scheme over the
//! categories declared by a [`TagScheme`](super::TagScheme).

use super::category::CategoryId;

/// BIO tag for one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// The token begins a span of the category.
    Begin(CategoryId),
    /// The token continues a span of the category.
    Inside(CategoryId),
    /// The token is not part of any aspect.
    Outside,
}

impl Tag {
    /// Check if this is a "Begin" tag.
    pub fn is_begin(&self) -> bool {
        matches!(self, Tag::Begin(_))
    }

    /// Check if this is an "Inside" tag.
    pub fn is_inside(&self) -> bool {
        matches!(self, Tag::Inside(_))
    }

    /// Get the category for this tag.
    pub fn category(&self) -> Option<CategoryId> {
        match self {
            Tag::Begin(c) | Tag::Inside(c) => Some(*c),
            Tag::Outside => None,
        }
    }

    /// Check if transitioning from `from` tag to `to` tag is valid.
    ///
    /// An `Inside` tag may only follow a `Begin` or `Inside` tag of the same
    /// category; everything else is allowed.
    pub fn is_valid_transition(from: Tag, to: Tag) -> bool {
        match to {
            Tag::Inside(c) => from.category() == Some(c),
            Tag::Begin(_) | Tag::Outside => true,
        }
    }

    /// Check if a sequence may start with this tag.
    pub fn is_valid_start(self) -> bool {
        Tag::is_valid_transition(Tag::Outside, self)
    }
}

/// Splits a `B-X` / `I-X` / `B_X` / `I_X` label into its marker and category name.
pub(crate) fn split_marker(label: &str) -> Option<(char, &str)> {
    let mut chars = label.chars();
    let marker = chars.next()?.to_ascii_uppercase();
    let sep = chars.next()?;
    let rest = chars.as_str();
    if matches!(marker, 'B' | 'I') && matches!(sep, '-' | '_') && !rest.is_empty() {
        Some((marker, rest))
    } else {
        None
    }
}
