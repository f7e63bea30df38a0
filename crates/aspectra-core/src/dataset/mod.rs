//! Loading of tagged documents (gold annotations or model predictions).
//!
//! Two formats are read:
//! - JSONL, one document per line:
//!   `{"id": "a1", "text": "...", "tokens": [...], "tags": [...], "offsets": [[0, 5], ...], "offset_unit": "char"}`
//!   where `id`, `text`, `offsets` and `offset_unit` are optional;
//! - CoNLL-style TSV: `token<TAB>tag` per line, a blank line between
//!   documents, lines starting with `#` and holding no tab skipped as
//!   comments.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AspectraError, Result};
use crate::text::Token;
use crate::types::Document;

/// Unit of the offsets in a JSONL record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetUnit {
    #[default]
    Byte,
    Char,
}

/// One JSONL line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub tokens: Vec<String>,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offsets: Option<Vec<(usize, usize)>>,
    #[serde(default)]
    pub offset_unit: OffsetUnit,
}

impl DocumentRecord {
    /// Converts the record into a validated document.
    ///
    /// Offsets are used when present (converted from characters if needed);
    /// otherwise tokens are aligned against `text`, or `text` is rebuilt from
    /// the tokens when it is missing too.
    ///
    /// # Errors
    ///
    /// Returns `AspectraError::InvalidDocument` when lengths or offsets are
    /// inconsistent.
    pub fn into_document(self) -> Result<Document> {
        if self.tokens.len() != self.tags.len() {
            return Err(AspectraError::InvalidDocument(format!(
                "{} tokens but {} tags",
                self.tokens.len(),
                self.tags.len()
            )));
        }

        let doc = match (self.text, self.offsets) {
            (Some(text), Some(offsets)) => {
                if offsets.len() != self.tokens.len() {
                    return Err(AspectraError::InvalidDocument(format!(
                        "{} tokens but {} offsets",
                        self.tokens.len(),
                        offsets.len()
                    )));
                }
                let offsets = match self.offset_unit {
                    OffsetUnit::Byte => offsets,
                    OffsetUnit::Char => char_to_byte_offsets(&text, &offsets)?,
                };
                let tokens = self
                    .tokens
                    .into_iter()
                    .zip(offsets)
                    .enumerate()
                    .map(|(i, (word, (start, end)))| Token::new(word, start, end, i))
                    .collect();
                Document::new(text, tokens, self.tags)?
            }
            (Some(text), None) => Document::from_aligned(text, self.tokens.as_slice(), self.tags)?,
            (None, _) => Document::from_words(self.tokens.as_slice(), self.tags)?,
        };

        Ok(match self.id {
            Some(id) => doc.with_id(id),
            None => doc,
        })
    }
}

impl From<&Document> for DocumentRecord {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id().map(str::to_string),
            text: Some(doc.text().to_string()),
            tokens: doc.tokens().iter().map(|t| t.text.clone()).collect(),
            tags: doc.labels().to_vec(),
            offsets: Some(doc.tokens().iter().map(|t| (t.start, t.end)).collect()),
            offset_unit: OffsetUnit::Byte,
        }
    }
}

fn char_to_byte_offsets(text: &str, offsets: &[(usize, usize)]) -> Result<Vec<(usize, usize)>> {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(b, _)| b)
        .chain(std::iter::once(text.len()))
        .collect();
    let to_byte = |c: usize| {
        boundaries.get(c).copied().ok_or_else(|| {
            AspectraError::InvalidDocument(format!(
                "character offset {c} beyond text of {} characters",
                boundaries.len() - 1
            ))
        })
    };
    offsets
        .iter()
        .map(|&(start, end)| Ok((to_byte(start)?, to_byte(end)?)))
        .collect()
}

fn at_line(line: usize) -> impl Fn(AspectraError) -> AspectraError {
    move |err| AspectraError::Dataset {
        line,
        message: err.to_string(),
    }
}

/// Reads JSONL documents. Blank lines are skipped.
///
/// # Errors
///
/// Returns `AspectraError::Dataset` with the line number for malformed or
/// inconsistent records, and `AspectraError::Io` for read failures.
pub fn read_jsonl<R: BufRead>(reader: R) -> Result<Vec<Document>> {
    let mut docs = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: DocumentRecord =
            serde_json::from_str(&line).map_err(|e| at_line(i + 1)(e.into()))?;
        docs.push(record.into_document().map_err(at_line(i + 1))?);
    }
    Ok(docs)
}

/// Reads CoNLL-style `token<TAB>tag` documents; text is rebuilt from tokens.
///
/// # Errors
///
/// Returns `AspectraError::Dataset` for lines without exactly one tab.
pub fn read_tsv<R: BufRead>(reader: R) -> Result<Vec<Document>> {
    let mut docs = Vec::new();
    let mut tokens: Vec<String> = Vec::new();
    let mut tags: Vec<String> = Vec::new();
    let mut start_line = 1;

    let mut flush = |tokens: &mut Vec<String>, tags: &mut Vec<String>, line: usize| -> Result<()> {
        if !tokens.is_empty() {
            let doc = Document::from_words(tokens.as_slice(), std::mem::take(tags)).map_err(at_line(line))?;
            docs.push(doc);
            tokens.clear();
        }
        Ok(())
    };

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim_end_matches(['\r', '\n']);

        if trimmed.trim().is_empty() {
            flush(&mut tokens, &mut tags, start_line)?;
            start_line = i + 2;
            continue;
        }

        // A `#` line with a tab is a data row for the token `#`
        if trimmed.starts_with('#') && !trimmed.contains('\t') {
            continue;
        }

        let parts: Vec<&str> = trimmed.split('\t').collect();
        if parts.len() != 2 {
            return Err(AspectraError::Dataset {
                line: i + 1,
                message: format!("expected `token<TAB>tag`, found {} fields", parts.len()),
            });
        }
        tokens.push(parts[0].to_string());
        tags.push(parts[1].trim().to_string());
    }

    // Don't forget the last document
    flush(&mut tokens, &mut tags, start_line)?;
    Ok(docs)
}

/// Loads documents from a file, choosing the format by extension:
/// `.jsonl`/`.json` read as JSONL, anything else as TSV.
///
/// # Errors
///
/// See [`read_jsonl`] and [`read_tsv`].
pub fn load_documents<P: AsRef<Path>>(path: P) -> Result<Vec<Document>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let docs = if is_jsonl(path) {
        read_jsonl(reader)?
    } else {
        read_tsv(reader)?
    };
    tracing::info!(path = %path.display(), documents = docs.len(), "loaded documents");
    Ok(docs)
}

/// Returns `true` if the path looks like a JSONL file.
pub fn is_jsonl(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("jsonl" | "json")
    )
}

/// Writes documents as JSONL with byte offsets.
///
/// # Errors
///
/// Returns `AspectraError::Io` or `AspectraError::Json` on failure.
pub fn write_jsonl<W: Write>(mut writer: W, docs: &[Document]) -> Result<()> {
    for doc in docs {
        let record = DocumentRecord::from(doc);
        serde_json::to_writer(&mut writer, &record)?;
        writeln!(writer)?;
    }
    Ok(())
}
