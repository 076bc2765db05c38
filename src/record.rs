//! Prediction records and their decoding.
//!
//! A [`RawPrediction`] is what inference emits: label ids, question token
//! ids and attention distributions. [`decode`] turns the id fields into
//! display strings and carries the attention fields over unchanged.

use serde::{Deserialize, Serialize};

use crate::vocab::{TokenId, Vocabulary};

/// One inference result, as produced by the model.
///
/// Unknown fields are rejected at deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPrediction {
    /// Id of the expected answer.
    pub actual_label: TokenId,
    /// Id of the model's answer.
    pub predicted_label: TokenId,
    /// Id of the question's type string.
    pub type_string: TokenId,
    /// Question token ids.
    pub src: Vec<TokenId>,
    /// Heads × tokens, each head aligned with `src`.
    pub question_word_attn: Vec<Vec<f32>>,
    /// Each node is a row of token ids.
    pub kb_nodes: Vec<Vec<TokenId>>,
    /// Aligned with `kb_nodes`.
    pub kb_node_attn: Vec<f32>,
    /// Per node, attention over that node's tokens.
    #[serde(default)]
    pub kb_node_word_attn: Vec<Vec<f32>>,
}

/// A prediction with its id fields resolved to strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedPrediction {
    /// The expected answer.
    pub actual_label: String,
    /// The model's answer.
    pub predicted_label: String,
    /// The question's type string.
    pub type_string: String,
    /// Question tokens.
    pub src: Vec<String>,
    /// Carried over from [`RawPrediction::question_word_attn`].
    pub question_word_attn: Vec<Vec<f32>>,
    /// Node token ids, decoded by the renderer.
    pub kb_nodes: Vec<Vec<TokenId>>,
    /// Carried over from [`RawPrediction::kb_node_attn`].
    pub kb_node_attn: Vec<f32>,
    /// Carried over from [`RawPrediction::kb_node_word_attn`].
    pub kb_node_word_attn: Vec<Vec<f32>>,
}

impl DecodedPrediction {
    /// True when the predicted label matches the expected one.
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.actual_label == self.predicted_label
    }
}

/// Resolves the id fields of `raw` through `vocab`.
///
/// Pure in its inputs: decoding the same record twice gives equal results.
/// Unknown ids decode to the vocabulary's unknown sentinel.
pub fn decode<V: Vocabulary + ?Sized>(raw: &RawPrediction, vocab: &V) -> DecodedPrediction {
    DecodedPrediction {
        actual_label: vocab.id_to_string(raw.actual_label).to_string(),
        predicted_label: vocab.id_to_string(raw.predicted_label).to_string(),
        type_string: vocab.id_to_string(raw.type_string).to_string(),
        src: vocab.ids_to_tokens(&raw.src),
        question_word_attn: raw.question_word_attn.clone(),
        kb_nodes: raw.kb_nodes.clone(),
        kb_node_attn: raw.kb_node_attn.clone(),
        kb_node_word_attn: raw.kb_node_word_attn.clone(),
    }
}
