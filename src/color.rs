//! Intensity-to-color mapping for attention weights.
//!
//! A weight in [0.0, 1.0] is mapped linearly onto a fixed stretch of the
//! xterm 256-color greyscale ramp. Foreground and background use different
//! stretches: text brightens from dark grey to white, backgrounds from
//! near-black to dark grey.
//!
//! Weights outside [0.0, 1.0] are not clamped. They extrapolate past the
//! gradient endpoints, so a weight of 1.5 yields a palette index beyond
//! [`WHITE`]. Only the escape sequence itself is bounded to a valid palette
//! entry when the text is written.

use std::fmt;

use crate::error::{InspectError, InspectResult};

/// Low end of the foreground gradient.
pub const DARK_GREY: u8 = 242;
/// High end of the foreground gradient.
pub const WHITE: u8 = 255;
/// Low end of the background gradient.
pub const BG_BLACK: u8 = 232;
/// High end of the background gradient.
pub const BG_DARK_GREY: u8 = 237;
/// Background used to highlight a correct answer.
pub const BG_SUCCESS: u8 = 22;
/// Background used to highlight a wrong answer.
pub const BG_FAILURE: u8 = 1;

const RESET: &str = "\x1b[0m";

/// Which part of the terminal cell a color applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// The glyph color.
    Foreground,
    /// The cell background.
    Background,
}

impl Layer {
    /// The (low, high) palette indices of this layer's gradient.
    #[must_use]
    pub const fn gradient(self) -> (u8, u8) {
        match self {
            Self::Foreground => (DARK_GREY, WHITE),
            Self::Background => (BG_BLACK, BG_DARK_GREY),
        }
    }

    const fn sgr(self) -> u8 {
        match self {
            Self::Foreground => 38,
            Self::Background => 48,
        }
    }
}

/// How to pair tokens with weights when the two sequences differ in length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZipPolicy {
    /// Pair up to the shorter of the two sequences and drop the rest.
    #[default]
    Truncate,
    /// Refuse to pair sequences of different lengths.
    Strict,
}

impl ZipPolicy {
    /// Returns how many pairs to emit for sequences of the given lengths.
    ///
    /// # Errors
    /// Returns [`InspectError::ShapeMismatch`] under [`ZipPolicy::Strict`]
    /// when the lengths differ.
    pub fn check(self, field: &str, expected: usize, actual: usize) -> InspectResult<usize> {
        match self {
            Self::Truncate => Ok(expected.min(actual)),
            Self::Strict if expected == actual => Ok(expected),
            Self::Strict => Err(InspectError::shape_mismatch(field, expected, actual)),
        }
    }
}

/// Whether rendered text carries terminal escapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Emit 256-color escapes.
    #[default]
    Always,
    /// Emit the bare tokens.
    Never,
}

/// Maps a weight onto the palette index of the given layer's gradient.
///
/// Computes `floor(low + weight * (high - low))` without clamping.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn color_index(weight: f32, layer: Layer) -> i32 {
    let (low, high) = layer.gradient();
    let low = f64::from(low);
    let high = f64::from(high);
    (low + f64::from(weight) * (high - low)).floor() as i32
}

/// A token paired with the palette color it should be shown in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledText {
    text: String,
    layer: Layer,
    index: i32,
}

impl StyledText {
    /// Wraps `text` in an explicit palette color.
    #[must_use]
    pub fn new(text: impl Into<String>, layer: Layer, index: i32) -> Self {
        Self {
            text: text.into(),
            layer,
            index,
        }
    }

    /// The unstyled token.
    #[must_use]
    pub fn plain(&self) -> &str {
        &self.text
    }

    /// The palette index computed for this token, before any bounding.
    #[must_use]
    pub const fn index(&self) -> i32 {
        self.index
    }

    /// Whether the color applies to the text or its background.
    #[must_use]
    pub const fn layer(&self) -> Layer {
        self.layer
    }

    /// Renders according to `mode`.
    #[must_use]
    pub fn render(&self, mode: ColorMode) -> String {
        match mode {
            ColorMode::Always => self.to_string(),
            ColorMode::Never => self.text.clone(),
        }
    }
}

impl fmt::Display for StyledText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let palette = self.index.clamp(0, 255);
        write!(
            f,
            "\x1b[{};5;{}m{}{RESET}",
            self.layer.sgr(),
            palette,
            self.text
        )
    }
}

/// Stylizes one token with the color for `weight`.
#[must_use]
pub fn color(token: impl Into<String>, weight: f32, layer: Layer) -> StyledText {
    StyledText::new(token, layer, color_index(weight, layer))
}

/// Stylizes `tokens` positionally by `weights`.
///
/// # Errors
/// Returns [`InspectError::ShapeMismatch`] when the lengths differ and
/// `policy` is [`ZipPolicy::Strict`].
pub fn color_text<S: AsRef<str>>(
    tokens: &[S],
    weights: &[f32],
    layer: Layer,
    policy: ZipPolicy,
) -> InspectResult<Vec<StyledText>> {
    policy.check("weights", tokens.len(), weights.len())?;
    Ok(tokens
        .iter()
        .zip(weights)
        .map(|(token, &weight)| color(token.as_ref(), weight, layer))
        .collect())
}
