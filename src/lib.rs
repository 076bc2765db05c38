//! # macinspect - Attention inspector for MAC-graph predictions
//!
//! macinspect replays the predictions of a trained MAC-graph question
//! answering network and shows where the model looked. Label ids are decoded
//! back into vocabulary strings, correctness and confusion tallies are kept
//! across the run, and every selected record is printed with its question
//! tokens and knowledge-graph nodes shaded by attention weight.
//!
//! ## Core Concepts
//!
//! - **RawPrediction**: one inference result with label ids and attention distributions
//! - **Vocabulary**: read-only id to string decoding
//! - **Renderer**: turns a decoded prediction into shaded terminal lines
//! - **Inspector**: drives the prediction stream, filters rows and keeps tallies
//!
//! ## Usage
//!
//! ```rust,ignore
//! use macinspect::{Inspector, JsonLinesReader, Renderer, RunOptions, Vocab, WriteSink};
//!
//! let vocab = Vocab::load(Path::new("vocab.txt"))?;
//! let inspector = Inspector::new(Renderer::new(&vocab), RunOptions::default());
//! let mut sink = WriteSink::new(std::io::stdout().lock());
//! let summary = inspector.run(JsonLinesReader::open(Path::new("predict.jsonl"))?, &mut sink)?;
//! println!("{}", summary.counters);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregate;
pub mod color;
pub mod config;
pub mod error;
pub mod input;
pub mod record;
pub mod render;
pub mod vocab;

// Re-export primary types at crate root for convenience
pub use aggregate::{
    ConfusionKey, Counters, DisplayFilter, Inspector, RunOptions, RunStats, RunSummary, Tally,
    DEFAULT_LIMIT,
};
pub use color::{color, color_index, color_text, ColorMode, Layer, StyledText, ZipPolicy};
pub use config::{RunConfig, CONFIG_FILE};
pub use error::{ConfigError, InputError, InspectError, InspectResult};
pub use input::{count_records, JsonLinesReader};
pub use record::{decode, DecodedPrediction, RawPrediction};
pub use render::{relevant_nodes, Renderer, RowSink, WriteSink, ATTN_THRESHOLD};
pub use vocab::{TokenId, Vocab, Vocabulary, UNK};
