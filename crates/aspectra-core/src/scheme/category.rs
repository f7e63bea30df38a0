use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a category: its position in the scheme's declared order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId(pub usize);

impl CategoryId {
    /// Position of the category in the scheme.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Terminal color used when rendering a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
}

impl Color {
    /// Palette handed out to categories that do not pick a color.
    pub const PALETTE: [Color; 6] = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Magenta,
        Color::Yellow,
        Color::Cyan,
    ];

    /// SGR foreground code for this color.
    #[must_use]
    pub fn ansi_code(self) -> u8 {
        match self {
            Self::Red => 31,
            Self::Green => 32,
            Self::Yellow => 33,
            Self::Blue => 34,
            Self::Magenta => 35,
            Self::Cyan => 36,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => write!(f, "red"),
            Self::Green => write!(f, "green"),
            Self::Yellow => write!(f, "yellow"),
            Self::Blue => write!(f, "blue"),
            Self::Magenta => write!(f, "magenta"),
            Self::Cyan => write!(f, "cyan"),
        }
    }
}

/// Declarative description of one aspect category, as found in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDef {
    /// Canonical upper-case name used in tags (`B-TASK`).
    pub name: String,
    /// Alternative spellings accepted when parsing labels (e.g. `Task`).
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Heading used when exactly one aspect is listed.
    #[serde(default)]
    pub singular: Option<String>,
    /// Heading used when several aspects are listed.
    #[serde(default)]
    pub plural: Option<String>,
    /// Color used in colorized output.
    #[serde(default)]
    pub color: Option<Color>,
}

impl CategoryDef {
    /// Creates a definition with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            singular: None,
            plural: None,
            color: None,
        }
    }

    /// Adds an alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Sets the singular and plural display names.
    pub fn with_display(mut self, singular: impl Into<String>, plural: impl Into<String>) -> Self {
        self.singular = Some(singular.into());
        self.plural = Some(plural.into());
        self
    }

    /// Sets the render color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// The four aspect categories of scientific abstracts.
    #[must_use]
    pub fn defaults() -> Vec<CategoryDef> {
        vec![
            CategoryDef::new("TASK")
                .with_alias("Task")
                .with_display("Задача", "Задачи")
                .with_color(Color::Red),
            CategoryDef::new("CONTRIBUTION")
                .with_alias("Contrib")
                .with_display("Вклад", "Вклад")
                .with_color(Color::Green),
            CategoryDef::new("METHOD")
                .with_alias("Method")
                .with_display("Метод", "Методы")
                .with_color(Color::Blue),
            CategoryDef::new("CONCLUSION")
                .with_alias("Conc")
                .with_display("Вывод", "Выводы")
                .with_color(Color::Magenta),
        ]
    }
}

/// A resolved category inside a [`TagScheme`](super::TagScheme).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub aliases: Vec<String>,
    pub singular: String,
    pub plural: String,
    pub color: Color,
}

impl Category {
    pub(crate) fn from_def(id: CategoryId, def: &CategoryDef) -> Self {
        let singular = def.singular.clone().unwrap_or_else(|| def.name.clone());
        let plural = def.plural.clone().unwrap_or_else(|| singular.clone());
        Self {
            id,
            name: def.name.clone(),
            aliases: def.aliases.clone(),
            singular,
            plural,
            color: def
                .color
                .unwrap_or(Color::PALETTE[id.index() % Color::PALETTE.len()]),
        }
    }

    /// Returns `true` if `name` is this category's name or one of its aliases,
    /// ignoring case.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
            || self
                .aliases
                .iter()
                .any(|alias| alias.to_lowercase() == name.to_lowercase())
    }

    /// Heading for a listing of `count` aspects.
    #[must_use]
    pub fn heading(&self, count: usize) -> &str {
        if count == 1 { &self.singular } else { &self.plural }
    }
}
