//! # Constrained Viterbi Decoding
//!
//! Finds the highest-scoring tag sequence under the BIO constraints: a
//! continuation tag may only follow a tag of its own category and may not
//! open a sequence.

use crate::error::{AspectraError, Result};
use crate::scheme::Tag;

/// Viterbi decoder over a fixed label vocabulary.
#[derive(Debug, Clone)]
pub struct ViterbiDecoder {
    num_tags: usize,
    allowed: Vec<Vec<bool>>,
    allowed_start: Vec<bool>,
}

impl ViterbiDecoder {
    /// Unconstrained decoder: every transition is allowed.
    pub fn new(num_tags: usize) -> Self {
        Self {
            num_tags,
            allowed: vec![vec![true; num_tags]; num_tags],
            allowed_start: vec![true; num_tags],
        }
    }

    /// Decoder whose constraints follow the given tags, one per label index.
    ///
    /// The order of `tags` is the model's output order, which need not match
    /// the scheme's own tag order.
    pub fn for_tags(tags: &[Tag]) -> Self {
        let allowed = tags
            .iter()
            .map(|&from| tags.iter().map(|&to| Tag::is_valid_transition(from, to)).collect())
            .collect();
        let allowed_start = tags.iter().map(|tag| tag.is_valid_start()).collect();
        Self {
            num_tags: tags.len(),
            allowed,
            allowed_start,
        }
    }

    pub fn num_tags(&self) -> usize {
        self.num_tags
    }

    pub fn is_allowed(&self, from: usize, to: usize) -> bool {
        self.allowed
            .get(from)
            .and_then(|row| row.get(to))
            .copied()
            .unwrap_or(false)
    }

    /// Decode the optimal tag sequence.
    ///
    /// # Arguments
    /// * `emissions` - Matrix of shape [seq_len, num_tags]
    /// * `transitions` - Optional learned scores of shape [num_tags, num_tags]
    ///
    /// # Errors
    ///
    /// Returns `AspectraError::Inference` on dimension mismatches or when no
    /// sequence satisfies the constraints.
    pub fn decode(
        &self,
        emissions: &[Vec<f32>],
        transitions: Option<&[Vec<f32>]>,
    ) -> Result<Vec<usize>> {
        let seq_len = emissions.len();
        if seq_len == 0 {
            return Ok(Vec::new());
        }
        self.check_dimensions(emissions, transitions)?;

        let transition = |from: usize, to: usize| transitions.map_or(0.0, |t| t[from][to]);

        let mut scores: Vec<Vec<f32>> = vec![vec![f32::NEG_INFINITY; self.num_tags]; seq_len];
        let mut backptr: Vec<Vec<usize>> = vec![vec![0; self.num_tags]; seq_len];

        for tag in 0..self.num_tags {
            if self.allowed_start[tag] {
                scores[0][tag] = emissions[0][tag];
            }
        }

        for pos in 1..seq_len {
            for curr in 0..self.num_tags {
                let mut best_score = f32::NEG_INFINITY;
                let mut best_prev = 0;

                for prev in 0..self.num_tags {
                    if !self.allowed[prev][curr] || scores[pos - 1][prev] == f32::NEG_INFINITY {
                        continue;
                    }
                    let score =
                        scores[pos - 1][prev] + transition(prev, curr) + emissions[pos][curr];
                    if score > best_score {
                        best_score = score;
                        best_prev = prev;
                    }
                }

                scores[pos][curr] = best_score;
                backptr[pos][curr] = best_prev;
            }
        }

        let (mut curr, best) = scores[seq_len - 1]
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (tag, score)| {
                if score > best.1 { (tag, score) } else { best }
            });
        if best == f32::NEG_INFINITY {
            return Err(AspectraError::Inference(
                "no tag sequence satisfies the transition constraints".into(),
            ));
        }

        let mut path = vec![curr];
        for pos in (1..seq_len).rev() {
            curr = backptr[pos][curr];
            path.push(curr);
        }
        path.reverse();
        Ok(path)
    }

    fn check_dimensions(&self, emissions: &[Vec<f32>], transitions: Option<&[Vec<f32>]>) -> Result<()> {
        if let Some(row) = emissions.iter().find(|row| row.len() != self.num_tags) {
            return Err(AspectraError::Inference(format!(
                "emission score dimension mismatch: expected {}, got {}",
                self.num_tags,
                row.len()
            )));
        }
        if let Some(t) = transitions {
            if t.len() != self.num_tags || t.iter().any(|row| row.len() != self.num_tags) {
                return Err(AspectraError::Inference(format!(
                    "transition matrix must be {0}x{0}",
                    self.num_tags
                )));
            }
        }
        Ok(())
    }
}
