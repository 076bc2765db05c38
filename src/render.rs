//! Attention rendering for decoded predictions.
//!
//! Each row renders as a fixed sequence of lines:
//!
//! 1. a correctness marker and the answer (plus the expected answer when wrong),
//! 2. one `Question:` line per attention head,
//! 3. a `node extract:` line over every knowledge-graph node,
//! 4. a `property extract:` line for each node whose attention exceeds
//!    [`ATTN_THRESHOLD`].

use std::io::Write;

use crate::color::{color_text, ColorMode, Layer, StyledText, ZipPolicy, BG_FAILURE, BG_SUCCESS};
use crate::error::{InspectError, InspectResult};
use crate::record::DecodedPrediction;
use crate::vocab::Vocabulary;

/// Node attention above which a node's own tokens are drilled into.
pub const ATTN_THRESHOLD: f32 = 0.3;

/// Marker for a correct answer.
pub const CORRECT_MARK: &str = "✅";
/// Marker for a wrong answer.
pub const WRONG_MARK: &str = "❌";

/// Indices of nodes relevant enough to show their property extract.
#[must_use]
pub fn relevant_nodes(node_attn: &[f32]) -> Vec<usize> {
    node_attn
        .iter()
        .enumerate()
        .filter(|&(_, &attn)| attn > ATTN_THRESHOLD)
        .map(|(idx, _)| idx)
        .collect()
}

/// Formats decoded predictions as colored terminal lines.
#[derive(Debug)]
pub struct Renderer<'v, V: Vocabulary + ?Sized> {
    vocab: &'v V,
    policy: ZipPolicy,
    mode: ColorMode,
}

impl<'v, V: Vocabulary + ?Sized> Renderer<'v, V> {
    /// Creates a renderer that truncates mismatched sequences and emits color.
    pub fn new(vocab: &'v V) -> Self {
        Self {
            vocab,
            policy: ZipPolicy::default(),
            mode: ColorMode::default(),
        }
    }

    /// The vocabulary this renderer decodes node tokens with.
    pub fn vocab(&self) -> &'v V {
        self.vocab
    }

    /// Set how mismatched attention lengths are handled (default: truncate).
    #[must_use]
    pub fn with_policy(mut self, policy: ZipPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set whether lines carry terminal escapes (default: always).
    #[must_use]
    pub fn with_color_mode(mut self, mode: ColorMode) -> Self {
        self.mode = mode;
        self
    }

    /// Renders one row.
    ///
    /// # Errors
    /// Returns [`InspectError::ShapeMismatch`] when an attention sequence does
    /// not line up with its tokens and the policy is [`ZipPolicy::Strict`].
    pub fn render(&self, row: &DecodedPrediction) -> InspectResult<Vec<String>> {
        let mut lines = Vec::with_capacity(2 + row.question_word_attn.len());
        lines.push(self.answer_line(row));

        for (head, weights) in row.question_word_attn.iter().enumerate() {
            let field = format!("question_word_attn[{head}]");
            let tokens = self.colored(&field, &row.src, weights)?;
            lines.push(format!("Question:  {}", tokens.join(" ")));
        }

        let nodes: Vec<String> = row
            .kb_nodes
            .iter()
            .map(|node| self.vocab.ids_to_string(node))
            .collect();
        let extract = self.colored("kb_node_attn", &nodes, &row.kb_node_attn)?;
        lines.push(format!("node extract:  {}", extract.join(", ")));

        for idx in relevant_nodes(&row.kb_node_attn) {
            let Some(node) = row.kb_nodes.get(idx) else {
                continue;
            };
            let weights: &[f32] = match row.kb_node_word_attn.get(idx) {
                Some(weights) => weights.as_slice(),
                None if self.policy == ZipPolicy::Strict => {
                    return Err(InspectError::shape_mismatch(
                        "kb_node_word_attn",
                        row.kb_nodes.len(),
                        row.kb_node_word_attn.len(),
                    ));
                }
                None => &[],
            };
            let field = format!("kb_node_word_attn[{idx}]");
            let words = self.colored(&field, &self.vocab.ids_to_tokens(node), weights)?;
            lines.push(format!("property extract:  {}", words.join(", ")));
        }

        Ok(lines)
    }

    fn answer_line(&self, row: &DecodedPrediction) -> String {
        if row.is_correct() {
            let answer = StyledText::new(&*row.predicted_label, Layer::Background, i32::from(BG_SUCCESS));
            format!("{CORRECT_MARK}   {}", answer.render(self.mode))
        } else {
            let answer = StyledText::new(&*row.predicted_label, Layer::Background, i32::from(BG_FAILURE));
            format!(
                "{WRONG_MARK}   {}, expected {}",
                answer.render(self.mode),
                row.actual_label
            )
        }
    }

    fn colored(&self, field: &str, tokens: &[String], weights: &[f32]) -> InspectResult<Vec<String>> {
        self.policy.check(field, tokens.len(), weights.len())?;
        Ok(color_text(tokens, weights, Layer::Foreground, ZipPolicy::Truncate)?
            .iter()
            .map(|styled| styled.render(self.mode))
            .collect())
    }
}

/// Receives rendered rows.
pub trait RowSink {
    /// Emits the lines of one row.
    ///
    /// # Errors
    /// Returns [`InspectError::Io`] if the underlying output fails.
    fn write_row(&mut self, lines: &[String]) -> InspectResult<()>;
}

/// Writes each line of a row to an [`std::io::Write`], newline terminated.
#[derive(Debug)]
pub struct WriteSink<W: Write> {
    out: W,
}

impl<W: Write> WriteSink<W> {
    /// Wraps `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RowSink for WriteSink<W> {
    fn write_row(&mut self, lines: &[String]) -> InspectResult<()> {
        for line in lines {
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Collects rows in memory.
impl RowSink for Vec<Vec<String>> {
    fn write_row(&mut self, lines: &[String]) -> InspectResult<()> {
        self.push(lines.to_vec());
        Ok(())
    }
}
