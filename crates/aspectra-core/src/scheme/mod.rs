//! # Tag Scheme
//!
//! The fixed vocabulary of aspect categories and BIO position markers.
//! A scheme is built once from configuration and then shared by reference;
//! it is never mutated afterwards.

pub mod bio_tags;
pub mod category;

pub use bio_tags::Tag;
pub use category::{Category, CategoryDef, CategoryId, Color};

use bio_tags::split_marker;

use crate::error::{AspectraError, Result};

/// Label used for tokens outside any aspect.
pub const OUTSIDE_LABEL: &str = "O";

/// Declared categories plus the BIO convention over them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagScheme {
    categories: Vec<Category>,
}

impl Default for TagScheme {
    fn default() -> Self {
        let categories = CategoryDef::defaults()
            .iter()
            .enumerate()
            .map(|(i, def)| Category::from_def(CategoryId(i), def))
            .collect();
        Self { categories }
    }
}

impl TagScheme {
    /// Builds a scheme from category definitions.
    ///
    /// # Errors
    ///
    /// Returns `AspectraError::InvalidConfig` if no category is declared,
    /// a name is empty or contains whitespace, or two categories share a
    /// name or alias (case-insensitively).
    pub fn new(defs: &[CategoryDef]) -> Result<Self> {
        if defs.is_empty() {
            return Err(AspectraError::InvalidConfig(
                "at least one category must be declared".into(),
            ));
        }

        let mut seen: Vec<String> = Vec::new();
        for def in defs {
            for name in std::iter::once(&def.name).chain(def.aliases.iter()) {
                if name.trim().is_empty() || name.chars().any(char::is_whitespace) {
                    return Err(AspectraError::InvalidConfig(format!(
                        "category name {name:?} must be non-empty and contain no whitespace"
                    )));
                }
                let folded = name.to_lowercase();
                if folded == OUTSIDE_LABEL.to_lowercase() {
                    return Err(AspectraError::InvalidConfig(format!(
                        "category name {name:?} collides with the outside label"
                    )));
                }
                if seen.contains(&folded) {
                    return Err(AspectraError::InvalidConfig(format!(
                        "category name {name:?} is declared twice"
                    )));
                }
                seen.push(folded);
            }
        }

        let categories = defs
            .iter()
            .enumerate()
            .map(|(i, def)| Category::from_def(CategoryId(i), def))
            .collect();
        Ok(Self { categories })
    }

    /// Categories in declared (display) order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Looks up a category by id.
    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.get(id.index())
    }

    /// Canonical name of a category, or `"?"` for an id from another scheme.
    pub fn name(&self, id: CategoryId) -> &str {
        self.category(id).map_or("?", |c| c.name.as_str())
    }

    /// Finds a category by name or alias, ignoring case.
    pub fn find(&self, name: &str) -> Option<CategoryId> {
        self.categories
            .iter()
            .find(|c| c.matches(name))
            .map(|c| c.id)
    }

    /// Total number of distinct tags: `O` plus `B-`/`I-` per category.
    pub fn num_tags(&self) -> usize {
        1 + 2 * self.categories.len()
    }

    /// Get all possible tags in index order.
    pub fn all_tags(&self) -> Vec<Tag> {
        (0..self.num_tags())
            .filter_map(|idx| self.from_index(idx))
            .collect()
    }

    /// Get the tag index for tensor operations.
    pub fn index(&self, tag: Tag) -> usize {
        match tag {
            Tag::Outside => 0,
            Tag::Begin(c) => 1 + 2 * c.index(),
            Tag::Inside(c) => 2 + 2 * c.index(),
        }
    }

    /// Get tag from index.
    pub fn from_index(&self, idx: usize) -> Option<Tag> {
        if idx == 0 {
            return Some(Tag::Outside);
        }
        let category = CategoryId((idx - 1) / 2);
        self.category(category)?;
        Some(if idx % 2 == 1 {
            Tag::Begin(category)
        } else {
            Tag::Inside(category)
        })
    }

    /// Canonical string form of a tag (`B-TASK`, `I-TASK`, `O`).
    pub fn label(&self, tag: Tag) -> String {
        match tag {
            Tag::Outside => OUTSIDE_LABEL.to_string(),
            Tag::Begin(c) => format!("B-{}", self.name(c)),
            Tag::Inside(c) => format!("I-{}", self.name(c)),
        }
    }

    /// Label vocabulary in index order.
    pub fn labels(&self) -> Vec<String> {
        self.all_tags().into_iter().map(|t| self.label(t)).collect()
    }

    /// Parses a label string.
    ///
    /// Accepts `O`, `B-X`, `I-X` (also with `_`), and a bare category name
    /// or alias. A bare name parses as a continuation: the span reconstructor
    /// opens a new span when none of that category is pending, so IO-style
    /// label sequences reconstruct the same way as BIO ones. For
    /// multi-label strings such as `Task|Method` only the first label is
    /// used, since spans cannot overlap; if any part is `O` the token is
    /// outside.
    ///
    /// Returns `None` for labels the scheme does not know.
    pub fn parse_tag(&self, raw: &str) -> Option<Tag> {
        let mut parts = raw.split('|').map(str::trim);
        if parts.clone().any(|p| p.eq_ignore_ascii_case(OUTSIDE_LABEL)) {
            return Some(Tag::Outside);
        }
        let raw = parts.next().unwrap_or_default();
        match split_marker(raw) {
            Some(('B', name)) => self.find(name).map(Tag::Begin),
            Some((_, name)) => self.find(name).map(Tag::Inside),
            None => self.find(raw).map(Tag::Inside),
        }
    }

    /// Parses a label, mapping unknown labels to `Outside`.
    ///
    /// The boolean is `false` when the label was not recognized.
    pub fn resolve_tag(&self, raw: &str) -> (Tag, bool) {
        match self.parse_tag(raw) {
            Some(tag) => (tag, true),
            None => (Tag::Outside, false),
        }
    }

    /// Checks that every label of a model's output vocabulary maps onto this
    /// scheme.
    ///
    /// # Errors
    ///
    /// Returns `AspectraError::SchemeMismatch` for the first label that
    /// references an undeclared category.
    pub fn validate_labels<I, S>(&self, labels: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for label in labels {
            let label = label.as_ref();
            if self.parse_tag(label).is_none() {
                return Err(AspectraError::SchemeMismatch {
                    label: label.to_string(),
                });
            }
        }
        Ok(())
    }
}
