mod tokenizer;

pub use tokenizer::{tokenize, RawFlag, TokenizedInput, FLAG_PREFIX};
