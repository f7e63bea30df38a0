use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scheme::CategoryId;

/// A category-labelled byte range: what the colorizer and the metrics
/// evaluator consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Mention {
    pub category: CategoryId,
    pub start: usize,
    pub end: usize,
}

impl Mention {
    pub fn new(category: CategoryId, start: usize, end: usize) -> Self {
        Self {
            category,
            start,
            end,
        }
    }
}

/// A contiguous run of tokens sharing one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub category: CategoryId,
    /// Index of the first token.
    pub start_token: usize,
    /// Index one past the last token.
    pub end_token: usize,
    /// Start byte offset in the document text.
    pub start: usize,
    /// End byte offset in the document text (exclusive).
    pub end: usize,
    /// Document text between `start` and `end`.
    pub text: String,
}

impl Span {
    /// Number of tokens in the span.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.end_token - self.start_token
    }

    #[must_use]
    pub fn mention(&self) -> Mention {
        Mention::new(self.category, self.start, self.end)
    }
}

/// The canonical form of one or more near-identical spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aspect {
    pub category: CategoryId,
    /// Canonical surface text.
    pub text: String,
    /// Every span collapsed into this aspect, in document order.
    pub occurrences: Vec<Mention>,
}

impl Aspect {
    /// Byte offset of the first occurrence.
    #[must_use]
    pub fn first_offset(&self) -> usize {
        self.occurrences.first().map_or(0, |m| m.start)
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Aspects of one category, in first-occurrence order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectGroup {
    pub category: CategoryId,
    /// Canonical category name.
    pub name: String,
    pub aspects: Vec<Aspect>,
}

/// Normalizer output: one group per category, in the scheme's order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AspectGroups {
    groups: Vec<AspectGroup>,
}

impl AspectGroups {
    pub(crate) fn from_groups(groups: Vec<AspectGroup>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[AspectGroup] {
        &self.groups
    }

    /// Looks up a group by canonical category name.
    pub fn get(&self, name: &str) -> Option<&AspectGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Canonical strings of one category, empty if the category is absent.
    pub fn texts(&self, name: &str) -> Vec<&str> {
        self.get(name)
            .map(|g| g.aspects.iter().map(|a| a.text.as_str()).collect())
            .unwrap_or_default()
    }

    /// Number of groups (including empty ones when they are emitted).
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of aspects across all categories.
    pub fn aspect_count(&self) -> usize {
        self.groups.iter().map(|g| g.aspects.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AspectGroup> {
        self.groups.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aspect(category: usize, text: &str, start: usize) -> Aspect {
        Aspect {
            category: CategoryId(category),
            text: text.into(),
            occurrences: vec![Mention::new(CategoryId(category), start, start + text.len())],
        }
    }

    #[test]
    fn span_mention_and_count() {
        let span = Span {
            category: CategoryId(2),
            start_token: 3,
            end_token: 6,
            start: 10,
            end: 30,
            text: "x".into(),
        };
        assert_eq!(span.token_count(), 3);
        assert_eq!(span.mention(), Mention::new(CategoryId(2), 10, 30));
    }

    #[test]
    fn groups_lookup() {
        let groups = AspectGroups::from_groups(vec![AspectGroup {
            category: CategoryId(0),
            name: "TASK".into(),
            aspects: vec![aspect(0, "Первая", 0), aspect(0, "Вторая", 20)],
        }]);
        assert_eq!(groups.texts("TASK"), ["Первая", "Вторая"]);
        assert!(groups.texts("METHOD").is_empty());
        assert_eq!(groups.aspect_count(), 2);
        assert_eq!(groups.get("TASK").unwrap().aspects[1].first_offset(), 20);
    }

    #[test]
    fn groups_serialize_as_list() {
        let groups = AspectGroups::from_groups(vec![AspectGroup {
            category: CategoryId(1),
            name: "METHOD".into(),
            aspects: vec![aspect(1, "SPH", 4)],
        }]);
        let json = serde_json::to_value(&groups).unwrap();
        assert_eq!(json[0]["name"], "METHOD");
        assert_eq!(json[0]["aspects"][0]["text"], "SPH");
    }
}
