//! # Span Reconstruction
//!
//! Turns a per-token tag sequence into contiguous aspect spans in one
//! left-to-right pass.
//!
//! Malformed input never fails the document:
//! - an unknown label is read as `O`;
//! - an `I-X` with no open span of category `X` (document start, after
//!   `O`, or after a span of another category) opens a new span, exactly as
//!   `B-X` would.
//!
//! Both recoveries are counted in the returned [`ReconstructionReport`],
//! together with discarded parts of multi-label tokens and spans that cover
//! no text (tagged words that could not be located in the source).

use serde::{Deserialize, Serialize};

use crate::scheme::{CategoryId, Tag, TagScheme};
use crate::text::Token;
use crate::types::{Document, Span};

/// Recoveries applied while reconstructing one document or a corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructionReport {
    /// Tokens processed.
    pub tokens: usize,
    /// `I-X` tags that had to be read as `B-X`.
    pub malformed_continuations: usize,
    /// Labels unknown to the scheme, read as `O`.
    pub unknown_tags: usize,
    /// Extra labels of `A|B` tokens that were discarded.
    pub dropped_labels: usize,
    /// Spans dropped because their tokens cover no text.
    pub empty_spans: usize,
}

impl ReconstructionReport {
    /// Returns `true` if any recovery was applied.
    #[must_use]
    pub fn has_recoveries(&self) -> bool {
        self.malformed_continuations > 0
            || self.unknown_tags > 0
            || self.dropped_labels > 0
            || self.empty_spans > 0
    }

    /// Adds another report's counters into this one.
    pub fn merge(&mut self, other: &ReconstructionReport) {
        self.tokens += other.tokens;
        self.malformed_continuations += other.malformed_continuations;
        self.unknown_tags += other.unknown_tags;
        self.dropped_labels += other.dropped_labels;
        self.empty_spans += other.empty_spans;
    }
}

/// Span pending in the state machine.
struct Pending {
    category: CategoryId,
    start_token: usize,
    end_token: usize,
    start: usize,
    end: usize,
}

impl Pending {
    fn open(category: CategoryId, token: &Token) -> Self {
        Self {
            category,
            start_token: token.index,
            end_token: token.index + 1,
            start: token.start,
            end: token.end,
        }
    }

    fn extend(&mut self, token: &Token) {
        // Zero-width tokens must not anchor the span start.
        if self.start == self.end {
            self.start_token = token.index;
            self.start = token.start;
        }
        self.end_token = token.index + 1;
        self.end = token.end;
    }

    /// Emits the span, or counts it when it covers no text.
    fn close(self, text: &str, spans: &mut Vec<Span>, report: &mut ReconstructionReport) {
        if self.start == self.end {
            report.empty_spans += 1;
            tracing::debug!(
                start_token = self.start_token,
                offset = self.start,
                "dropping span that covers no text"
            );
            return;
        }
        spans.push(Span {
            category: self.category,
            start_token: self.start_token,
            end_token: self.end_token,
            start: self.start,
            end: self.end,
            text: text[self.start..self.end].to_string(),
        });
    }
}

/// Rebuilds spans from tagged tokens.
#[derive(Debug, Clone, Copy)]
pub struct SpanReconstructor<'a> {
    scheme: &'a TagScheme,
}

impl<'a> SpanReconstructor<'a> {
    pub fn new(scheme: &'a TagScheme) -> Self {
        Self { scheme }
    }

    /// Resolves a document's raw labels and reconstructs its spans.
    pub fn reconstruct(&self, doc: &Document) -> (Vec<Span>, ReconstructionReport) {
        let mut unknown = 0;
        let mut dropped = 0;
        let tags: Vec<Tag> = doc
            .iter()
            .map(|(token, label)| {
                let (tag, known) = self.scheme.resolve_tag(label);
                if !known {
                    unknown += 1;
                    tracing::debug!(label, index = token.index, "unknown tag read as O");
                }
                let extra = label.split('|').count() - 1;
                if extra > 0 {
                    dropped += extra;
                    tracing::debug!(label, index = token.index, ?tag, "multi-label token reduced to one tag");
                }
                tag
            })
            .collect();

        let (spans, mut report) = self.reconstruct_tags(doc.text(), doc.tokens(), &tags);
        report.unknown_tags = unknown;
        report.dropped_labels = dropped;

        if report.has_recoveries() {
            tracing::warn!(
                doc = doc.id().unwrap_or("-"),
                malformed = report.malformed_continuations,
                unknown = report.unknown_tags,
                dropped = report.dropped_labels,
                empty = report.empty_spans,
                "recovered from malformed tag sequence"
            );
        }
        (spans, report)
    }

    /// Reconstructs spans from already-resolved tags.
    ///
    /// `tokens` and `tags` are zipped; extra entries on either side are
    /// ignored. Token offsets must lie within `text`.
    pub fn reconstruct_tags(
        &self,
        text: &str,
        tokens: &[Token],
        tags: &[Tag],
    ) -> (Vec<Span>, ReconstructionReport) {
        let mut spans = Vec::new();
        let mut report = ReconstructionReport::default();
        let mut pending: Option<Pending> = None;

        for (token, &tag) in tokens.iter().zip(tags) {
            report.tokens += 1;
            match tag {
                Tag::Outside => {
                    if let Some(span) = pending.take() {
                        span.close(text, &mut spans, &mut report);
                    }
                }
                Tag::Begin(category) => {
                    if let Some(span) = pending.take() {
                        span.close(text, &mut spans, &mut report);
                    }
                    pending = Some(Pending::open(category, token));
                }
                Tag::Inside(category) => match pending.as_mut() {
                    Some(span) if span.category == category => span.extend(token),
                    _ => {
                        report.malformed_continuations += 1;
                        tracing::debug!(
                            category = self.scheme.name(category),
                            index = token.index,
                            "continuation without open span, starting a new one"
                        );
                        if let Some(span) = pending.take() {
                            span.close(text, &mut spans, &mut report);
                        }
                        pending = Some(Pending::open(category, token));
                    }
                },
            }
        }

        if let Some(span) = pending.take() {
            span.close(text, &mut spans, &mut report);
        }

        (spans, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(words: &[&str], labels: &[&str]) -> Document {
        Document::from_words(words, labels.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn merges_begin_and_continuations() {
        let scheme = TagScheme::default();
        let doc = doc(
            &["Восстановление", "коэффициентов", "системы"],
            &["B-TASK", "I-TASK", "I-TASK"],
        );
        let (spans, report) = SpanReconstructor::new(&scheme).reconstruct(&doc);

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].category, scheme.find("TASK").unwrap());
        assert_eq!(spans[0].text, "Восстановление коэффициентов системы");
        assert_eq!((spans[0].start_token, spans[0].end_token), (0, 3));
        assert!(!report.has_recoveries());
        assert_eq!(report.tokens, 3);
    }

    #[test]
    fn lone_continuation_opens_span() {
        let scheme = TagScheme::default();
        let doc = doc(&["метод"], &["I-METHOD"]);
        let (spans, report) = SpanReconstructor::new(&scheme).reconstruct(&doc);

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].category, scheme.find("METHOD").unwrap());
        assert_eq!(spans[0].start_token, 0);
        assert_eq!(spans[0].text, "метод");
        assert_eq!(report.malformed_continuations, 1);
    }

    #[test]
    fn category_switch_on_continuation_splits() {
        let scheme = TagScheme::default();
        let doc = doc(
            &["задача", "оптимизации", "методом", "Ньютона"],
            &["B-TASK", "I-TASK", "I-METHOD", "I-METHOD"],
        );
        let (spans, report) = SpanReconstructor::new(&scheme).reconstruct(&doc);

        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "задача оптимизации");
        assert_eq!(spans[1].text, "методом Ньютона");
        assert_eq!(report.malformed_continuations, 1);
    }

    #[test]
    fn begin_closes_pending_span_of_same_category() {
        let scheme = TagScheme::default();
        let doc = doc(&["метод", "SPH", "метод", "AMR"], &["B-METHOD", "I-METHOD", "B-METHOD", "I-METHOD"]);
        let (spans, _) = SpanReconstructor::new(&scheme).reconstruct(&doc);
        let texts: Vec<_> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["метод SPH", "метод AMR"]);
    }

    #[test]
    fn unknown_tags_are_outside() {
        let scheme = TagScheme::default();
        let doc = doc(&["новый", "датасет", "метод"], &["B-DATASET", "I-DATASET", "B-METHOD"]);
        let (spans, report) = SpanReconstructor::new(&scheme).reconstruct(&doc);

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "метод");
        assert_eq!(report.unknown_tags, 2);
    }

    #[test]
    fn io_style_labels_reconstruct() {
        let scheme = TagScheme::default();
        let doc = doc(
            &["Рассмотрены", "методы", "SPH", "и", "AMR"],
            &["O", "Method", "Method", "O", "Method"],
        );
        let (spans, _) = SpanReconstructor::new(&scheme).reconstruct(&doc);
        let texts: Vec<_> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["методы SPH", "AMR"]);
    }

    #[test]
    fn preserves_original_spacing_and_punctuation() {
        let scheme = TagScheme::default();
        let text = "Метод  сглаженных частиц (SPH) хорош";
        let words = ["Метод", "сглаженных", "частиц", "(", "SPH", ")", "хорош"];
        let labels = ["B-METHOD", "I-METHOD", "I-METHOD", "I-METHOD", "I-METHOD", "I-METHOD", "O"];
        let doc = Document::from_aligned(text, &words, labels.iter().map(|s| s.to_string()).collect())
            .unwrap();
        let (spans, _) = SpanReconstructor::new(&scheme).reconstruct(&doc);
        assert_eq!(spans[0].text, "Метод  сглаженных частиц (SPH)");
    }

    #[test]
    fn empty_document_yields_no_spans() {
        let scheme = TagScheme::default();
        let doc = Document::new("", Vec::new(), Vec::new()).unwrap();
        let (spans, report) = SpanReconstructor::new(&scheme).reconstruct(&doc);
        assert!(spans.is_empty());
        assert_eq!(report, ReconstructionReport::default());
    }

    #[test]
    fn spans_never_overlap_and_cover_tagged_tokens() {
        let scheme = TagScheme::default();
        let labels = [
            "I-TASK", "I-TASK", "O", "B-METHOD", "I-TASK", "B-TASK", "I-CONCLUSION", "O", "junk",
            "I-METHOD", "B-METHOD", "I-METHOD", "O",
        ];
        let words: Vec<String> = (0..labels.len()).map(|i| format!("w{i}")).collect();
        let doc = Document::from_words(&words, labels.iter().map(|s| s.to_string()).collect())
            .unwrap();
        let (spans, _) = SpanReconstructor::new(&scheme).reconstruct(&doc);

        for pair in spans.windows(2) {
            assert!(pair[0].end <= pair[1].start);
            assert!(pair[0].start < pair[1].start);
        }

        for (i, label) in labels.iter().enumerate() {
            let tagged = scheme.resolve_tag(label).0 != Tag::Outside;
            let owners = spans
                .iter()
                .filter(|s| s.start_token <= i && i < s.end_token)
                .count();
            assert_eq!(owners, usize::from(tagged), "token {i} ({label})");
        }
    }

    #[test]
    fn unlocated_words_never_produce_empty_spans() {
        let scheme = TagScheme::default();
        let doc = Document::from_aligned(
            "метод",
            &["SPH", "метод"],
            vec!["B-TASK".into(), "B-METHOD".into()],
        )
        .unwrap();
        let (spans, report) = SpanReconstructor::new(&scheme).reconstruct(&doc);

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].category, scheme.find("METHOD").unwrap());
        assert_eq!((spans[0].start, spans[0].end), (0, "метод".len()));
        assert_eq!(report.empty_spans, 1);
        assert!(report.has_recoveries());
    }

    #[test]
    fn unlocated_word_does_not_anchor_span_start() {
        let scheme = TagScheme::default();
        let text = "новый метод частиц";
        let doc = Document::from_aligned(
            text,
            &["новый", "SPH", "метод", "частиц"],
            vec!["O".into(), "B-METHOD".into(), "I-METHOD".into(), "I-METHOD".into()],
        )
        .unwrap();
        let (spans, report) = SpanReconstructor::new(&scheme).reconstruct(&doc);

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "метод частиц");
        assert_eq!(spans[0].start_token, 2);
        assert_eq!(report.empty_spans, 0);
    }

    #[test]
    fn multi_label_tokens_are_counted() {
        let scheme = TagScheme::default();
        let doc = doc(&["задача", "метода", "вывод"], &["Task|Method", "Task|O", "Conc"]);
        let (spans, report) = SpanReconstructor::new(&scheme).reconstruct(&doc);

        let texts: Vec<_> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["задача", "вывод"]);
        assert_eq!(report.dropped_labels, 2);
        assert_eq!(report.unknown_tags, 0);
    }
}
