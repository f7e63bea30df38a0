//! # Aspect Normalization
//!
//! Groups spans by category and collapses near-duplicates into canonical
//! aspects.
//!
//! Two spans of one category are duplicates when their keys (case-folded,
//! whitespace-collapsed, trailing punctuation removed) are equal, or when
//! one key is a prefix or suffix of the other and covers at least
//! `min_overlap` of its length. The longest surface form wins; on equal
//! length the earlier one stays. A merged aspect keeps the position of its
//! earliest occurrence.
//!
//! Canonical forms are surface text: an aspect keeps the inflected form it
//! had in the sentence ("Задачу восстановления", not "Задача
//! восстановления"). No lemmatization to the nominative case is applied.

use crate::config::ExtractorConfig;
use crate::scheme::TagScheme;
use crate::types::{Aspect, AspectGroup, AspectGroups, Mention, Span};

/// Paired punctuation, opening to closing.
const PAIRED: &[(char, char)] = &[('(', ')'), ('[', ']'), ('«', '»'), ('{', '}')];
/// Quotes that open and close with the same character.
const SYMMETRIC_QUOTES: &[char] = &['"'];
/// Punctuation stripped from the end of a span before it becomes an aspect.
const TRAILING_SEPARATORS: &[char] = &[',', ';', ':'];

/// Options of the normalizer, taken from [`ExtractorConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizerOptions {
    pub min_overlap: f32,
    pub emit_empty_categories: bool,
    pub balance_punctuation: bool,
    pub capitalize: bool,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self::from(&ExtractorConfig::default())
    }
}

impl From<&ExtractorConfig> for NormalizerOptions {
    fn from(config: &ExtractorConfig) -> Self {
        Self {
            min_overlap: config.min_overlap,
            emit_empty_categories: config.emit_empty_categories,
            balance_punctuation: config.balance_punctuation,
            capitalize: config.capitalize,
        }
    }
}

/// Working entry of the deduplication pass.
struct Entry {
    key: String,
    surface: String,
    occurrences: Vec<Mention>,
}

impl Entry {
    fn absorb(&mut self, other: Entry) {
        if other.surface.chars().count() > self.surface.chars().count() {
            self.key = other.key;
            self.surface = other.surface;
        }
        self.occurrences.extend(other.occurrences);
        self.occurrences.sort();
    }
}

/// Collapses spans into canonical aspects per category.
#[derive(Debug, Clone, Copy)]
pub struct AspectNormalizer<'a> {
    scheme: &'a TagScheme,
    options: NormalizerOptions,
}

impl<'a> AspectNormalizer<'a> {
    pub fn new(scheme: &'a TagScheme, options: NormalizerOptions) -> Self {
        Self { scheme, options }
    }

    /// Normalizes the spans of one document.
    ///
    /// Groups follow the scheme's category order; categories without spans
    /// are omitted unless `emit_empty_categories` is set.
    pub fn normalize(&self, spans: &[Span]) -> AspectGroups {
        let groups = self
            .scheme
            .categories()
            .iter()
            .filter_map(|category| {
                let entries = self.dedup(spans.iter().filter(|s| s.category == category.id));
                if entries.is_empty() && !self.options.emit_empty_categories {
                    return None;
                }
                let aspects = entries
                    .into_iter()
                    .map(|entry| Aspect {
                        category: category.id,
                        text: self.finish(&entry.surface),
                        occurrences: entry.occurrences,
                    })
                    .collect();
                Some(AspectGroup {
                    category: category.id,
                    name: category.name.clone(),
                    aspects,
                })
            })
            .collect();

        AspectGroups::from_groups(groups)
    }

    fn dedup<'s>(&self, spans: impl Iterator<Item = &'s Span>) -> Vec<Entry> {
        let mut entries: Vec<Entry> = Vec::new();

        for span in spans {
            let surface = span
                .text
                .trim()
                .trim_end_matches(TRAILING_SEPARATORS)
                .trim_end()
                .to_string();
            let key = dedup_key(&surface);
            if key.is_empty() {
                tracing::debug!(text = %span.text, "skipping span without content");
                continue;
            }

            let entry = Entry {
                key,
                surface,
                occurrences: vec![span.mention()],
            };
            match entries
                .iter()
                .position(|e| is_duplicate(&e.key, &entry.key, self.options.min_overlap))
            {
                Some(idx) => {
                    entries[idx].absorb(entry);
                    self.cascade(&mut entries, idx);
                }
                None => entries.push(entry),
            }
        }

        entries
    }

    /// After the canonical form at `idx` grew, folds in any other entry that
    /// now duplicates it. The survivor sits at the earlier position.
    fn cascade(&self, entries: &mut Vec<Entry>, mut idx: usize) {
        loop {
            let key = &entries[idx].key;
            let found = entries
                .iter()
                .enumerate()
                .position(|(j, e)| j != idx && is_duplicate(&e.key, key, self.options.min_overlap));
            let Some(other) = found else { break };

            let (keep, drop) = if other < idx { (other, idx) } else { (idx, other) };
            let removed = entries.remove(drop);
            entries[keep].absorb(removed);
            idx = keep;
        }
    }

    fn finish(&self, surface: &str) -> String {
        let mut text = surface.to_string();
        if self.options.balance_punctuation {
            text = balance_punctuation(&text);
        }
        if self.options.capitalize {
            text = capitalize(&text);
        }
        text
    }
}

/// Comparison key: lower-cased, single-spaced, trailing punctuation removed.
pub fn dedup_key(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .to_lowercase()
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || matches!(c, '«' | '»' | '…' | '—' | '–'))
        .trim_end()
        .to_string()
}

/// Returns `true` if two keys denote the same aspect.
pub fn is_duplicate(a: &str, b: &str, min_overlap: f32) -> bool {
    if a == b {
        return true;
    }
    let (a_len, b_len) = (a.chars().count(), b.chars().count());
    let (short, long, short_len, long_len) = if a_len <= b_len {
        (a, b, a_len, b_len)
    } else {
        (b, a, b_len, a_len)
    };
    if short_len == 0 || !(long.starts_with(short) || long.ends_with(short)) {
        return false;
    }
    short_len as f32 / long_len as f32 >= min_overlap
}

/// Completes unbalanced paired punctuation.
///
/// Unmatched closing marks get their opening counterpart prepended;
/// unmatched opening marks (and odd quotes) get closed at the end, innermost
/// first. Only punctuation is touched; words keep their inflected surface
/// form.
pub fn balance_punctuation(text: &str) -> String {
    let mut open: Vec<char> = Vec::new();
    let mut unmatched_close: Vec<char> = Vec::new();

    for c in text.chars() {
        if SYMMETRIC_QUOTES.contains(&c) {
            if let Some(pos) = open.iter().rposition(|&o| o == c) {
                open.remove(pos);
            } else {
                open.push(c);
            }
        } else if PAIRED.iter().any(|&(o, _)| o == c) {
            open.push(c);
        } else if let Some(&(o, _)) = PAIRED.iter().find(|&&(_, cl)| cl == c) {
            if let Some(pos) = open.iter().rposition(|&x| x == o) {
                open.remove(pos);
            } else {
                unmatched_close.push(c);
            }
        }
    }

    let mut balanced = String::with_capacity(text.len() + open.len() + unmatched_close.len());
    for &c in &unmatched_close {
        balanced.push(opening_of(c));
    }
    balanced.push_str(text);
    for &c in open.iter().rev() {
        balanced.push(closing_of(c));
    }
    balanced
}

fn opening_of(close: char) -> char {
    PAIRED
        .iter()
        .find(|&&(_, c)| c == close)
        .map_or(close, |&(o, _)| o)
}

fn closing_of(open: char) -> char {
    PAIRED
        .iter()
        .find(|&&(o, _)| o == open)
        .map_or(open, |&(_, c)| c)
}

/// Upper-cases the first character. The phrase is not lemmatized, so an
/// accusative "задачу" becomes "Задачу".
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::SpanReconstructor;
    use crate::scheme::CategoryId;
    use crate::types::Document;

    fn spans(words: &[&str], labels: &[&str]) -> Vec<Span> {
        let scheme = TagScheme::default();
        let doc =
            Document::from_words(words, labels.iter().map(|s| s.to_string()).collect()).unwrap();
        SpanReconstructor::new(&scheme).reconstruct(&doc).0
    }

    fn raw_options() -> NormalizerOptions {
        NormalizerOptions {
            capitalize: false,
            balance_punctuation: false,
            ..NormalizerOptions::default()
        }
    }

    #[test]
    fn prefix_duplicate_keeps_longer() {
        let scheme = TagScheme::default();
        let spans = spans(
            &["Восстановление", "коэффициентов", ".", "Восстановление", "коэффициентов", "системы"],
            &["B-TASK", "I-TASK", "O", "B-TASK", "I-TASK", "I-TASK"],
        );
        let groups = AspectNormalizer::new(&scheme, raw_options()).normalize(&spans);

        assert_eq!(groups.texts("TASK"), ["Восстановление коэффициентов системы"]);
        let aspect = &groups.get("TASK").unwrap().aspects[0];
        assert_eq!(aspect.occurrences.len(), 2);
        assert_eq!(aspect.first_offset(), 0);
    }

    #[test]
    fn case_whitespace_and_trailing_punctuation_collapse() {
        let scheme = TagScheme::default();
        let spans = spans(
            &["Метод", "SPH", "и", "метод", "sph", "."],
            &["B-METHOD", "I-METHOD", "O", "B-METHOD", "I-METHOD", "I-METHOD"],
        );
        let groups = AspectNormalizer::new(&scheme, raw_options()).normalize(&spans);
        assert_eq!(groups.texts("METHOD"), ["метод sph."]);
    }

    #[test]
    fn equal_length_keeps_first() {
        let scheme = TagScheme::default();
        let spans = spans(
            &["метод", "SPH", "и", "Метод", "SPH"],
            &["B-METHOD", "I-METHOD", "O", "B-METHOD", "I-METHOD"],
        );
        let groups = AspectNormalizer::new(&scheme, raw_options()).normalize(&spans);
        assert_eq!(groups.texts("METHOD"), ["метод SPH"]);
    }

    #[test]
    fn short_overlap_is_not_a_duplicate() {
        let scheme = TagScheme::default();
        let spans = spans(
            &["метод", ",", "метод", "сглаженных", "частиц", "в", "гидродинамике"],
            &["B-METHOD", "O", "B-METHOD", "I-METHOD", "I-METHOD", "I-METHOD", "I-METHOD"],
        );
        let groups = AspectNormalizer::new(&scheme, raw_options()).normalize(&spans);
        assert_eq!(
            groups.texts("METHOD"),
            ["метод", "метод сглаженных частиц в гидродинамике"]
        );
    }

    #[test]
    fn suffix_duplicate_collapses() {
        let scheme = TagScheme::default();
        let spans = spans(
            &["сглаженных", "частиц", "и", "метод", "сглаженных", "частиц"],
            &["B-METHOD", "I-METHOD", "O", "B-METHOD", "I-METHOD", "I-METHOD"],
        );
        let groups = AspectNormalizer::new(&scheme, raw_options()).normalize(&spans);
        assert_eq!(groups.texts("METHOD"), ["метод сглаженных частиц"]);
    }

    #[test]
    fn growth_cascades_into_later_entries() {
        let scheme = TagScheme::default();
        // "a b" and "b c d" are distinct until "a b c d" arrives, which
        // duplicates the first and, once canonical, the second as well.
        let options = NormalizerOptions {
            min_overlap: 0.3,
            ..raw_options()
        };
        let spans = spans(
            &["alpha", "beta", ".", "beta", "gamma", "delta", ".", "alpha", "beta", "gamma", "delta"],
            &["B-TASK", "I-TASK", "O", "B-TASK", "I-TASK", "I-TASK", "O", "B-TASK", "I-TASK", "I-TASK", "I-TASK"],
        );
        let groups = AspectNormalizer::new(&scheme, options).normalize(&spans);
        let task = groups.get("TASK").unwrap();
        assert_eq!(groups.texts("TASK"), ["alpha beta gamma delta"]);
        assert_eq!(task.aspects[0].occurrences.len(), 3);
    }

    #[test]
    fn groups_follow_scheme_order_and_first_occurrence() {
        let scheme = TagScheme::default();
        let spans = spans(
            &["SPH", "задача", "AMR", "вывод", "задача", "два"],
            &["B-METHOD", "B-TASK", "B-METHOD", "B-CONCLUSION", "B-TASK", "I-TASK"],
        );
        let groups = AspectNormalizer::new(&scheme, raw_options()).normalize(&spans);
        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["TASK", "METHOD", "CONCLUSION"]);
        assert_eq!(groups.texts("METHOD"), ["SPH", "AMR"]);
        assert_eq!(groups.texts("TASK"), ["задача два"]);
    }

    #[test]
    fn empty_categories_are_configurable() {
        let scheme = TagScheme::default();
        let normalizer = AspectNormalizer::new(&scheme, raw_options());
        assert!(normalizer.normalize(&[]).is_empty());

        let options = NormalizerOptions {
            emit_empty_categories: true,
            ..raw_options()
        };
        let groups = AspectNormalizer::new(&scheme, options).normalize(&[]);
        assert_eq!(groups.len(), 4);
        assert_eq!(groups.aspect_count(), 0);
    }

    #[test]
    fn normalization_is_idempotent() {
        let scheme = TagScheme::default();
        let spans = spans(
            &["метод", "SPH", "(", "AMR", "метод", "SPH", "и", "задача"],
            &["B-METHOD", "I-METHOD", "I-METHOD", "I-METHOD", "B-METHOD", "I-METHOD", "O", "B-TASK"],
        );
        let normalizer = AspectNormalizer::new(&scheme, NormalizerOptions::default());
        assert_eq!(normalizer.normalize(&spans), normalizer.normalize(&spans));
    }

    #[test]
    fn finishing_balances_and_capitalizes() {
        let scheme = TagScheme::default();
        let spans = spans(
            &["эйлеровы", "методы", "(", "AMR", ","],
            &["B-METHOD", "I-METHOD", "I-METHOD", "I-METHOD", "I-METHOD"],
        );
        let groups = AspectNormalizer::new(&scheme, NormalizerOptions::default()).normalize(&spans);
        assert_eq!(groups.texts("METHOD"), ["Эйлеровы методы (AMR)"]);
    }

    #[test]
    fn punctuation_only_span_is_skipped() {
        let span = Span {
            category: CategoryId(0),
            start_token: 0,
            end_token: 1,
            start: 0,
            end: 1,
            text: ",".into(),
        };
        let scheme = TagScheme::default();
        let groups = AspectNormalizer::new(&scheme, raw_options()).normalize(&[span]);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_dedup_key() {
        assert_eq!(dedup_key("  Метод   SPH. "), "метод sph");
        assert_eq!(dedup_key("«AMR»"), "«amr");
        assert_eq!(dedup_key("..."), "");
    }

    #[test]
    fn test_is_duplicate() {
        assert!(is_duplicate("метод", "метод", 0.9));
        assert!(is_duplicate("восстановление коэффициентов", "восстановление коэффициентов системы", 0.5));
        assert!(!is_duplicate("метод", "метод сглаженных частиц", 0.5));
        assert!(is_duplicate("метод", "метод сглаженных частиц", 0.2));
        assert!(!is_duplicate("сеть", "нейронная модель", 0.0));
    }

    #[test]
    fn test_balance_punctuation() {
        assert_eq!(balance_punctuation("метод (SPH"), "метод (SPH)");
        assert_eq!(balance_punctuation("SPH) метод"), "(SPH) метод");
        assert_eq!(balance_punctuation("«метод [a"), "«метод [a]»");
        assert_eq!(balance_punctuation("\"метод"), "\"метод\"");
        assert_eq!(balance_punctuation("\"метод\" (a)"), "\"метод\" (a)");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("эйлеровы методы"), "Эйлеровы методы");
        assert_eq!(capitalize("SPH"), "SPH");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn canonical_form_keeps_inflection() {
        let scheme = TagScheme::default();
        let spans = spans(
            &["Решаем", "задачу", "восстановления", "(", "обратную"],
            &["O", "B-TASK", "I-TASK", "I-TASK", "I-TASK"],
        );
        let groups = AspectNormalizer::new(&scheme, NormalizerOptions::default()).normalize(&spans);
        assert_eq!(groups.texts("TASK"), ["Задачу восстановления (обратную)"]);
    }
}
