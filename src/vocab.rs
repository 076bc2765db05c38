//! Vocabulary lookup for decoding model output ids.
//!
//! The vocabulary is loaded once per run and only ever read. Ids that fall
//! outside the table decode to [`UNK`] rather than failing.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::InputError;

/// Numeric id of a vocabulary token.
pub type TokenId = u32;

/// Sentinel returned for ids the vocabulary does not know.
pub const UNK: &str = "<unk>";

/// Read-only id to string decoding.
pub trait Vocabulary {
    /// Decodes a single id, returning [`UNK`] for unknown ids.
    fn id_to_string(&self, id: TokenId) -> &str;

    /// Decodes a sequence of ids token by token.
    fn ids_to_tokens(&self, ids: &[TokenId]) -> Vec<String> {
        ids.iter()
            .map(|&id| self.id_to_string(id).to_string())
            .collect()
    }

    /// Decodes a sequence of ids into one space-separated string.
    fn ids_to_string(&self, ids: &[TokenId]) -> String {
        ids.iter()
            .map(|&id| self.id_to_string(id))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// In-memory vocabulary where a token's id is its position in the table.
#[derive(Debug, Clone, Default)]
pub struct Vocab {
    tokens: Vec<String>,
    ids: HashMap<String, TokenId>,
}

impl Vocab {
    /// Builds a vocabulary from tokens in id order.
    ///
    /// When a token repeats, reverse lookup resolves to its first id.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let mut ids = HashMap::with_capacity(tokens.len());
        for (id, token) in (0..).zip(&tokens) {
            ids.entry(token.clone()).or_insert(id);
        }
        Self { tokens, ids }
    }

    /// Loads a vocabulary file holding one token per line.
    ///
    /// Trailing whitespace on each line is ignored; blank lines are kept so
    /// ids stay aligned with line numbers.
    ///
    /// # Errors
    /// Returns [`InputError::Read`] if the file cannot be read and
    /// [`InputError::EmptyVocab`] if it holds no tokens.
    pub fn load(path: &Path) -> Result<Self, InputError> {
        let text = fs::read_to_string(path).map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let vocab = Self::from_tokens(text.lines().map(str::trim_end));
        if vocab.is_empty() {
            return Err(InputError::EmptyVocab {
                path: path.to_path_buf(),
            });
        }
        Ok(vocab)
    }

    /// Reverse lookup of a token's id.
    #[must_use]
    pub fn id_of(&self, token: &str) -> Option<TokenId> {
        self.ids.get(token).copied()
    }

    /// Number of tokens in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when the table holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Vocabulary for Vocab {
    fn id_to_string(&self, id: TokenId) -> &str {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.tokens.get(idx))
            .map_or(UNK, String::as_str)
    }
}
