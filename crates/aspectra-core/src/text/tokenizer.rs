//! # Word Tokenizer
//!
//! Splits scientific text into word and punctuation tokens for sequence
//! labeling, keeping byte offsets into the original string.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A token extracted from a document with positional information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The token text content
    pub text: String,
    /// Start byte offset in the original string
    pub start: usize,
    /// End byte offset in the original string (exclusive)
    pub end: usize,
    /// Token index in the sequence
    pub index: usize,
}

impl Token {
    pub fn new(text: impl Into<String>, start: usize, end: usize, index: usize) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            index,
        }
    }
}

/// Punctuation that is always split into one token per character.
const SPLIT_PUNCT: &[char] = &[
    '(', ')', ':', ';', ',', '.', '"', '»', '«', '[', ']', '{', '}', '%', '^',
];

/// Word/punctuation tokenizer.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    re_word: Regex,
}

impl Tokenizer {
    /// Create a new tokenizer instance.
    ///
    /// # Errors
    ///
    /// Returns `AspectraError::RegexError` if the word pattern fails to
    /// compile (should never happen with the static pattern).
    pub fn new() -> Result<Self> {
        Ok(Self {
            re_word: Regex::new(r"\w+|[^\w\s]+")?,
        })
    }

    /// Tokenize text into words and punctuation.
    ///
    /// Runs of punctuation made only of brackets, quotes and sentence marks
    /// are split into single characters, so `).` becomes `)` and `.`.
    ///
    /// # Examples
    /// ```
    /// use aspectra_core::text::Tokenizer;
    ///
    /// let tokenizer = Tokenizer::new().unwrap();
    /// let tokens = tokenizer.tokenize("Метод (SPH).");
    /// let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
    /// assert_eq!(texts, ["Метод", "(", "SPH", ")", "."]);
    /// ```
    pub fn tokenize(&self, input: &str) -> Vec<Token> {
        let mut tokens = Vec::new();

        for m in self.re_word.find_iter(input) {
            let piece = m.as_str();
            if piece.chars().all(|c| SPLIT_PUNCT.contains(&c)) {
                for (offset, c) in piece.char_indices() {
                    let start = m.start() + offset;
                    tokens.push(Token::new(
                        c.to_string(),
                        start,
                        start + c.len_utf8(),
                        tokens.len(),
                    ));
                }
            } else {
                tokens.push(Token::new(piece, m.start(), m.end(), tokens.len()));
            }
        }

        tokens
    }
}

/// Marks that attach to the preceding word without a space.
const UNPAIRED_PUNCT: &str = ".,:;!?%^";
/// Opening brackets; the following word attaches without a space.
const OPENING: &[&str] = &["(", "[", "«", "{"];
/// Closing brackets; they attach to the preceding word without a space.
const CLOSING: &[&str] = &[")", "]", "»", "}"];

/// Rebuilds text from words, returning the byte range of every word.
///
/// No space is inserted before sentence punctuation and closing brackets,
/// nor after opening brackets.
pub fn detokenize_with_offsets<S: AsRef<str>>(words: &[S]) -> (String, Vec<(usize, usize)>) {
    let mut text = String::new();
    let mut offsets = Vec::with_capacity(words.len());
    let mut sep = "";

    for word in words {
        let word = word.as_ref();
        if UNPAIRED_PUNCT.contains(word) || CLOSING.contains(&word) {
            offsets.push((text.len(), text.len() + word.len()));
            text.push_str(word);
        } else {
            text.push_str(sep);
            offsets.push((text.len(), text.len() + word.len()));
            text.push_str(word);
            sep = if OPENING.contains(&word) { "" } else { " " };
        }
    }

    (text, offsets)
}

/// Rebuilds text from words. See [`detokenize_with_offsets`].
pub fn detokenize<S: AsRef<str>>(words: &[S]) -> String {
    detokenize_with_offsets(words).0
}

/// Locates each word of a model's output in the original text, left to right.
///
/// A word that cannot be found after the cursor receives an empty range at
/// the cursor position, so its tag still occupies a slot in the sequence.
pub fn align<S: AsRef<str>>(text: &str, words: &[S]) -> Vec<Token> {
    let mut cursor = 0;
    let mut tokens = Vec::with_capacity(words.len());

    for (index, word) in words.iter().enumerate() {
        let word = word.as_ref();
        let found = if word.is_empty() {
            None
        } else {
            text[cursor..]
                .find(word)
                .map(|pos| (pos, pos + word.len()))
                .or_else(|| find_ignore_case(&text[cursor..], word))
        };
        match found {
            Some((start, end)) => {
                let (start, end) = (cursor + start, cursor + end);
                tokens.push(Token::new(word, start, end, index));
                cursor = end;
            }
            None => {
                tracing::warn!(word, index, "token not found in text, using an empty range");
                tokens.push(Token::new(word, cursor, cursor, index));
            }
        }
    }

    tokens
}

/// Byte range of the first case-insensitive occurrence of `needle`.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let needle = needle.to_lowercase();
    for (start, _) in haystack.char_indices() {
        let mut lowered = String::with_capacity(needle.len());
        for (offset, ch) in haystack[start..].char_indices() {
            lowered.extend(ch.to_lowercase());
            if lowered.len() >= needle.len() {
                if lowered == needle {
                    return Some((start, start + offset + ch.len_utf8()));
                }
                break;
            }
        }
    }
    None
}
