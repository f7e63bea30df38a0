//! # Span Metrics
//!
//! Exact-match evaluation of predicted spans against gold spans: a
//! prediction is a true positive only if a gold span has the same category
//! and the same byte range.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::scheme::TagScheme;
use crate::types::Mention;

/// Raw match counts of one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl Counts {
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        harmonic_mean(self.precision(), self.recall())
    }

    /// Number of gold spans.
    pub fn support(&self) -> usize {
        self.true_positives + self.false_negatives
    }

    fn add(&mut self, other: &Counts) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn harmonic_mean(p: f64, r: f64) -> f64 {
    if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
}

/// Scores of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMetrics {
    pub name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
    pub counts: Counts,
}

/// Averaged scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Average {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Per-category and averaged scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub categories: Vec<CategoryMetrics>,
    /// Scores over the summed counts of all categories.
    pub micro: Average,
    /// Unweighted mean over categories that have gold or predicted spans.
    pub macro_avg: Average,
    pub documents: usize,
}

impl MetricsReport {
    /// Looks up one category's scores.
    pub fn category(&self, name: &str) -> Option<&CategoryMetrics> {
        self.categories.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .categories
            .iter()
            .map(|c| c.name.chars().count())
            .chain(std::iter::once("macro avg".len()))
            .max()
            .unwrap_or(0);

        writeln!(
            f,
            "{:>width$}  {:>9}  {:>9}  {:>9}  {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.categories {
            writeln!(
                f,
                "{:>width$}  {:>9.4}  {:>9.4}  {:>9.4}  {:>9}",
                c.name, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        let support: usize = self.categories.iter().map(|c| c.support).sum();
        for (label, avg) in [("micro avg", self.micro), ("macro avg", self.macro_avg)] {
            writeln!(
                f,
                "{:>width$}  {:>9.4}  {:>9.4}  {:>9.4}  {:>9}",
                label, avg.precision, avg.recall, avg.f1, support
            )?;
        }
        Ok(())
    }
}

/// Accumulates span matches over documents.
#[derive(Debug, Clone)]
pub struct Evaluator<'a> {
    scheme: &'a TagScheme,
    counts: Vec<Counts>,
    documents: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(scheme: &'a TagScheme) -> Self {
        Self {
            scheme,
            counts: vec![Counts::default(); scheme.categories().len()],
            documents: 0,
        }
    }

    /// Matches one document's predictions against its gold spans.
    ///
    /// Each gold span can be matched once; repeated predictions of the same
    /// span count as false positives. Mentions of categories outside the
    /// scheme are ignored.
    pub fn add_document(&mut self, gold: &[Mention], predicted: &[Mention]) {
        self.documents += 1;
        let known = |m: &&Mention| m.category.index() < self.counts.len();

        let mut remaining: HashMap<Mention, usize> = HashMap::new();
        for mention in gold.iter().filter(known) {
            *remaining.entry(*mention).or_default() += 1;
        }

        let mut doc_counts = vec![Counts::default(); self.counts.len()];
        for mention in predicted.iter().filter(known) {
            let counts = &mut doc_counts[mention.category.index()];
            match remaining.get_mut(mention) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    counts.true_positives += 1;
                }
                _ => counts.false_positives += 1,
            }
        }
        for (mention, left) in remaining {
            doc_counts[mention.category.index()].false_negatives += left;
        }

        for (total, doc) in self.counts.iter_mut().zip(&doc_counts) {
            total.add(doc);
        }
    }

    /// Raw counts of one category.
    pub fn counts(&self, name: &str) -> Option<Counts> {
        self.scheme.find(name).map(|id| self.counts[id.index()])
    }

    /// Computes the scores accumulated so far.
    pub fn report(&self) -> MetricsReport {
        let categories: Vec<CategoryMetrics> = self
            .scheme
            .categories()
            .iter()
            .zip(&self.counts)
            .map(|(category, counts)| CategoryMetrics {
                name: category.name.clone(),
                precision: counts.precision(),
                recall: counts.recall(),
                f1: counts.f1(),
                support: counts.support(),
                counts: *counts,
            })
            .collect();

        let mut total = Counts::default();
        for counts in &self.counts {
            total.add(counts);
        }
        let micro = Average {
            precision: total.precision(),
            recall: total.recall(),
            f1: total.f1(),
        };

        let present: Vec<&CategoryMetrics> = categories
            .iter()
            .filter(|c| c.support > 0 || c.counts.false_positives > 0)
            .collect();
        let macro_avg = if present.is_empty() {
            Average::default()
        } else {
            let n = present.len() as f64;
            Average {
                precision: present.iter().map(|c| c.precision).sum::<f64>() / n,
                recall: present.iter().map(|c| c.recall).sum::<f64>() / n,
                f1: present.iter().map(|c| c.f1).sum::<f64>() / n,
            }
        };

        MetricsReport {
            categories,
            micro,
            macro_avg,
            documents: self.documents,
        }
    }
}
