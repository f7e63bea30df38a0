//! # Presentation
//!
//! Pure rendering of extraction results: the source text with aspect spans
//! highlighted, or a numbered listing of aspects per category.

use std::fmt::Write as _;

use crate::config::MarkerStyle;
use crate::scheme::{CategoryId, TagScheme};
use crate::types::{AspectGroups, Mention};

const ANSI_RESET: &str = "\x1b[0m";

/// Renders aspects with a scheme's names, headings and colors.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    scheme: &'a TagScheme,
    style: MarkerStyle,
}

impl<'a> Renderer<'a> {
    pub fn new(scheme: &'a TagScheme, style: MarkerStyle) -> Self {
        Self { scheme, style }
    }

    /// Returns `text` with every mention wrapped in its category marker.
    ///
    /// Mentions that overlap an earlier one, fall outside the text or cut a
    /// character in half are left unmarked.
    pub fn colorize(&self, text: &str, mentions: &[Mention]) -> String {
        let mut sorted = mentions.to_vec();
        sorted.sort_by_key(|m| (m.start, m.end));

        let mut out = String::with_capacity(text.len() + mentions.len() * 16);
        let mut cursor = 0;
        for mention in sorted {
            if mention.start < cursor
                || mention.end > text.len()
                || mention.start > mention.end
                || !text.is_char_boundary(mention.start)
                || !text.is_char_boundary(mention.end)
            {
                tracing::warn!(?mention, "skipping mention that cannot be marked");
                continue;
            }
            out.push_str(&text[cursor..mention.start]);
            let (open, close) = self.markers(mention.category);
            out.push_str(&open);
            out.push_str(&text[mention.start..mention.end]);
            out.push_str(&close);
            cursor = mention.end;
        }
        out.push_str(&text[cursor..]);
        out
    }

    fn markers(&self, category: CategoryId) -> (String, String) {
        match self.style {
            MarkerStyle::Ansi => {
                let code = self
                    .scheme
                    .category(category)
                    .map_or(1, |c| c.color.ansi_code());
                (format!("\x1b[1;{code}m"), ANSI_RESET.to_string())
            }
            MarkerStyle::Tags => {
                let name = self.scheme.name(category);
                (format!("<{name}>"), format!("</{name}>"))
            }
        }
    }

    /// Numbered listing per category, in the scheme's category order.
    ///
    /// ```text
    /// МЕТОДЫ
    /// 1. Лагранжев бессеточный метод сглаженных частиц (SPH)
    /// 2. Эйлеровы методы с использованием адаптивных сеток (AMR)
    /// ВКЛАД
    /// 1. Перечислены различные свойства этих подходов
    /// ```
    pub fn grouped(&self, groups: &AspectGroups) -> String {
        let mut ordered: Vec<_> = groups.iter().collect();
        ordered.sort_by_key(|g| g.category);

        let mut out = String::new();
        for group in ordered {
            let heading = self
                .scheme
                .category(group.category)
                .map_or(group.name.as_str(), |c| c.heading(group.aspects.len()));
            let _ = writeln!(out, "{}", heading.to_uppercase());
            for (i, aspect) in group.aspects.iter().enumerate() {
                let _ = writeln!(out, "{}. {}", i + 1, aspect.text);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractorConfig;
    use crate::extract::AspectExtractor;
    use crate::types::Document;

    fn sample() -> Document {
        Document::from_words(
            &["Эйлеровы", "методы", "(", "AMR", ")", "и", "метод", "SPH", "решают", "задачу"],
            ["B-METHOD", "I-METHOD", "I-METHOD", "I-METHOD", "I-METHOD", "O", "B-METHOD", "I-METHOD", "O", "B-TASK"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn colorize_with_tags() {
        let extractor =
            AspectExtractor::new(ExtractorConfig::new().with_marker(MarkerStyle::Tags)).unwrap();
        let doc = sample();
        let extraction = extractor.extract_document(&doc);
        let rendered = extractor.renderer().colorize(doc.text(), &extraction.mentions());
        assert_eq!(
            rendered,
            "<METHOD>Эйлеровы методы (AMR)</METHOD> и <METHOD>метод SPH</METHOD> решают <TASK>задачу</TASK>"
        );
    }

    #[test]
    fn colorize_with_ansi() {
        let extractor = AspectExtractor::with_defaults();
        let doc = sample();
        let extraction = extractor.extract_document(&doc);
        let rendered = extractor.renderer().colorize(doc.text(), &extraction.mentions());
        assert!(rendered.starts_with("\x1b[1;34mЭйлеровы методы (AMR)\x1b[0m и "));
        assert!(rendered.ends_with("\x1b[1;31mзадачу\x1b[0m"));
    }

    #[test]
    fn colorize_without_mentions_is_identity() {
        let scheme = TagScheme::default();
        let renderer = Renderer::new(&scheme, MarkerStyle::Ansi);
        assert_eq!(renderer.colorize("просто текст", &[]), "просто текст");
        assert_eq!(renderer.colorize("", &[]), "");
    }

    #[test]
    fn colorize_skips_unmarkable_mentions() {
        let scheme = TagScheme::default();
        let renderer = Renderer::new(&scheme, MarkerStyle::Tags);
        let task = scheme.find("TASK").unwrap();
        let mentions = [
            Mention::new(task, 0, 4),
            Mention::new(task, 2, 6),
            Mention::new(task, 5, 99),
        ];
        assert_eq!(renderer.colorize("abcdefgh", &mentions), "<TASK>abcd</TASK>efgh");
    }

    #[test]
    fn grouped_listing() {
        let extractor = AspectExtractor::with_defaults();
        let extraction = extractor.extract_document(&sample());
        let rendered = extractor.renderer().grouped(&extraction.aspects);
        assert_eq!(
            rendered,
            "ЗАДАЧА\n1. Задачу\nМЕТОДЫ\n1. Эйлеровы методы (AMR)\n2. Метод SPH\n"
        );
    }

    #[test]
    fn grouped_listing_with_empty_categories() {
        let extractor =
            AspectExtractor::new(ExtractorConfig::new().with_empty_categories(true)).unwrap();
        let doc = Document::new("", Vec::new(), Vec::new()).unwrap();
        let extraction = extractor.extract_document(&doc);
        let rendered = extractor.renderer().grouped(&extraction.aspects);
        assert_eq!(rendered, "ЗАДАЧИ\nВКЛАД\nМЕТОДЫ\nВЫВОДЫ\n");
    }
}
