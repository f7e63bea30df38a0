pub mod tokenizer;

pub use tokenizer::{Token, Tokenizer, align, detokenize, detokenize_with_offsets};
