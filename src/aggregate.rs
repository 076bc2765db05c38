//! Stream aggregation and display filtering.
//!
//! [`Inspector::run`] pulls predictions one at a time, decodes them, keeps
//! running tallies and hands the rows that pass the display filter to the
//! renderer. Tallies are updated for every record that passes the type
//! prefix filter, whether or not it is displayed.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{InspectError, InspectResult};
use crate::record::{decode, DecodedPrediction, RawPrediction};
use crate::render::{Renderer, RowSink, CORRECT_MARK, WRONG_MARK};
use crate::vocab::Vocabulary;

/// Default number of rows inspected per run.
pub const DEFAULT_LIMIT: usize = 20;

/// Frequency count keyed by display string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tally(BTreeMap<String, u64>);

impl Tally {
    /// Adds one to `key`.
    pub fn increment(&mut self, key: impl Into<String>) {
        *self.0.entry(key.into()).or_insert(0) += 1;
    }

    /// Count for `key`, zero if never seen.
    #[must_use]
    pub fn get(&self, key: &str) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing has been counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The `n` highest counts, ties broken by key order.
    #[must_use]
    pub fn most_common(&self, n: usize) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries.truncate(n);
        entries
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(key, &count)| (key.as_str(), count))
    }
}

/// The (correctness, expected, actual, type) combination a confusion entry
/// is tallied under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionKey<'a> {
    /// Whether the prediction matched.
    pub correct: bool,
    /// The expected label.
    pub expected: &'a str,
    /// The predicted label.
    pub actual: &'a str,
    /// The record's type string.
    pub type_string: &'a str,
}

impl<'a> ConfusionKey<'a> {
    /// The key a decoded row is tallied under.
    #[must_use]
    pub fn of(row: &'a DecodedPrediction) -> Self {
        Self {
            correct: row.is_correct(),
            expected: &row.actual_label,
            actual: &row.predicted_label,
            type_string: &row.type_string,
        }
    }
}

impl fmt::Display for ConfusionKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.correct { CORRECT_MARK } else { WRONG_MARK };
        write!(
            f,
            "{mark} \texp:{} \tact:{} \t{}",
            self.expected, self.actual, self.type_string
        )
    }
}

/// Per-run record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Records pulled from the stream.
    pub consumed: u64,
    /// Records dropped by the type prefix filter.
    pub skipped: u64,
    /// Records counted into the tallies.
    pub processed: u64,
    /// Processed records whose prediction matched.
    pub correct: u64,
    /// Records handed to the renderer.
    pub displayed: u64,
}

/// Running tallies for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Counters {
    /// Expected label frequencies.
    pub output_classes: Tally,
    /// Predicted label frequencies.
    pub predicted_classes: Tally,
    /// Counts per [`ConfusionKey`] display form.
    pub confusion: Tally,
    /// Per-run record counts.
    pub stats: RunStats,
}

impl Counters {
    /// Counts `row` into every tally and returns whether it was correct.
    pub fn record(&mut self, row: &DecodedPrediction) -> bool {
        let key = ConfusionKey::of(row);
        self.output_classes.increment(&*row.actual_label);
        self.predicted_classes.increment(&*row.predicted_label);
        self.confusion.increment(key.to_string());
        self.stats.processed += 1;
        if key.correct {
            self.stats.correct += 1;
        }
        key.correct
    }

    /// Fraction of processed records that were correct.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn accuracy(&self) -> Option<f64> {
        (self.stats.processed > 0)
            .then(|| self.stats.correct as f64 / self.stats.processed as f64)
    }
}

impl fmt::Display for Counters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "processed {} of {} records ({} skipped, {} displayed)",
            self.stats.processed, self.stats.consumed, self.stats.skipped, self.stats.displayed
        )?;
        match self.accuracy() {
            Some(accuracy) => writeln!(f, "accuracy: {:.2}%", accuracy * 100.0)?,
            None => writeln!(f, "accuracy: n/a")?,
        }
        for (title, tally) in [
            ("output classes", &self.output_classes),
            ("predicted classes", &self.predicted_classes),
            ("confusion", &self.confusion),
        ] {
            writeln!(f, "{title}:")?;
            for (key, count) in tally.most_common(tally.len()) {
                writeln!(f, "  {count:>6}  {key}")?;
            }
        }
        Ok(())
    }
}

/// Which rows are handed to the renderer.
///
/// Setting both flags is accepted and suppresses every row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayFilter {
    /// Display only correct predictions.
    pub correct_only: bool,
    /// Display only wrong predictions.
    pub wrong_only: bool,
}

impl DisplayFilter {
    /// Whether a row with the given correctness is displayed.
    #[must_use]
    pub const fn should_display(self, correct: bool) -> bool {
        match (self.correct_only, self.wrong_only) {
            (true, true) => false,
            (true, false) => correct,
            (false, true) => !correct,
            (false, false) => true,
        }
    }
}

/// Options controlling one inspection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// The run stops once `limit + 1` records have been consumed.
    pub limit: usize,
    /// Only records whose type string starts with this are counted.
    pub type_prefix: Option<String>,
    /// Which counted records are displayed.
    pub filter: DisplayFilter,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            type_prefix: None,
            filter: DisplayFilter::default(),
        }
    }
}

impl RunOptions {
    fn accepts(&self, type_string: &str) -> bool {
        self.type_prefix
            .as_deref()
            .map_or(true, |prefix| type_string.starts_with(prefix))
    }
}

/// Final tallies of a run, with its wall-clock bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Tallies accumulated over the run.
    pub counters: Counters,
    /// When the run started pulling records.
    pub started_at: DateTime<Utc>,
    /// When the stream ended or the limit was reached.
    pub finished_at: DateTime<Utc>,
}

/// Drives a prediction stream through decoding, counting and rendering.
#[derive(Debug)]
pub struct Inspector<'v, V: Vocabulary + ?Sized> {
    renderer: Renderer<'v, V>,
    options: RunOptions,
}

impl<'v, V: Vocabulary + ?Sized> Inspector<'v, V> {
    /// Creates an inspector that renders displayed rows with `renderer`.
    pub fn new(renderer: Renderer<'v, V>, options: RunOptions) -> Self {
        Self { renderer, options }
    }

    /// The options this inspector runs with.
    #[must_use]
    pub const fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Runs the inspection over `predictions`, writing displayed rows to `sink`.
    ///
    /// The stream is pulled lazily and never past `limit + 1` records.
    ///
    /// # Errors
    /// The first stream, render or sink error ends the run and is returned.
    pub fn run<I, E, S>(&self, predictions: I, sink: &mut S) -> InspectResult<RunSummary>
    where
        I: IntoIterator<Item = Result<RawPrediction, E>>,
        InspectError: From<E>,
        S: RowSink + ?Sized,
    {
        let started_at = Utc::now();
        let mut counters = Counters::default();

        for prediction in predictions
            .into_iter()
            .take(self.options.limit.saturating_add(1))
        {
            let raw = prediction?;
            counters.stats.consumed += 1;

            let row = decode(&raw, self.renderer.vocab());
            if !self.options.accepts(&row.type_string) {
                counters.stats.skipped += 1;
                debug!(type_string = %row.type_string, "skipping record outside type prefix");
                continue;
            }

            let correct = counters.record(&row);
            if self.options.filter.should_display(correct) {
                sink.write_row(&self.renderer.render(&row)?)?;
                counters.stats.displayed += 1;
            }
        }

        debug!(
            consumed = counters.stats.consumed,
            processed = counters.stats.processed,
            displayed = counters.stats.displayed,
            "inspection finished"
        );

        Ok(RunSummary {
            counters,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;
    use crate::vocab::Vocab;

    fn vocab() -> Vocab {
        Vocab::from_tokens(["<unk>", "yes", "no", "graph.node.color", "graph.edge.line", "is", "red"])
    }

    fn raw(actual: u32, predicted: u32, type_string: u32) -> RawPrediction {
        RawPrediction {
            actual_label: actual,
            predicted_label: predicted,
            type_string,
            src: vec![5, 6],
            question_word_attn: vec![vec![0.4, 0.6]],
            kb_nodes: vec![vec![6]],
            kb_node_attn: vec![0.9],
            kb_node_word_attn: vec![vec![1.0]],
        }
    }

    fn ok(records: Vec<RawPrediction>) -> impl Iterator<Item = Result<RawPrediction, Infallible>> {
        records.into_iter().map(Ok)
    }

    fn run(options: RunOptions, records: Vec<RawPrediction>) -> (RunSummary, Vec<Vec<String>>) {
        let vocab = vocab();
        let inspector = Inspector::new(Renderer::new(&vocab), options);
        let mut rows: Vec<Vec<String>> = Vec::new();
        let summary = inspector.run(ok(records), &mut rows).unwrap();
        (summary, rows)
    }

    #[test]
    fn test_tally_most_common() {
        let mut tally = Tally::default();
        tally.increment("b");
        tally.increment("a");
        tally.increment("b");
        tally.increment("c");
        assert_eq!(tally.most_common(2), vec![("b", 2), ("a", 1)]);
        assert_eq!(tally.total(), 4);
        assert_eq!(tally.get("missing"), 0);
    }

    #[test]
    fn test_confusion_key_format() {
        let vocab = vocab();
        let row = decode(&raw(1, 2, 3), &vocab);
        assert_eq!(
            ConfusionKey::of(&row).to_string(),
            "❌ \texp:yes \tact:no \tgraph.node.color"
        );
    }

    #[test]
    fn test_display_filter_truth_table() {
        let neither = DisplayFilter::default();
        assert!(neither.should_display(true) && neither.should_display(false));

        let correct_only = DisplayFilter { correct_only: true, wrong_only: false };
        assert!(correct_only.should_display(true));
        assert!(!correct_only.should_display(false));

        let wrong_only = DisplayFilter { correct_only: false, wrong_only: true };
        assert!(!wrong_only.should_display(true));
        assert!(wrong_only.should_display(false));

        let both = DisplayFilter { correct_only: true, wrong_only: true };
        assert!(!both.should_display(true));
        assert!(!both.should_display(false));
    }

    #[test]
    fn test_row_limit_processes_limit_plus_one() {
        let records = (0..25).map(|_| raw(1, 1, 3)).collect();
        let options = RunOptions { limit: 20, ..RunOptions::default() };
        let (summary, rows) = run(options, records);
        assert_eq!(summary.counters.stats.consumed, 21);
        assert_eq!(summary.counters.stats.processed, 21);
        assert_eq!(rows.len(), 21);
    }

    #[test]
    fn test_row_limit_does_not_pull_past_cap() {
        let vocab = vocab();
        let inspector = Inspector::new(Renderer::new(&vocab), RunOptions { limit: 2, ..RunOptions::default() });
        let mut pulled = 0;
        let stream = std::iter::repeat_with(|| {
            pulled += 1;
            Ok::<_, Infallible>(raw(1, 1, 3))
        });
        let mut rows: Vec<Vec<String>> = Vec::new();
        inspector.run(stream, &mut rows).unwrap();
        assert_eq!(pulled, 3);
    }

    #[test]
    fn test_short_stream_ends_naturally() {
        let (summary, _) = run(RunOptions::default(), vec![raw(1, 1, 3), raw(1, 2, 3)]);
        assert_eq!(summary.counters.stats.consumed, 2);
        assert_eq!(summary.counters.stats.correct, 1);
        assert_eq!(summary.counters.accuracy(), Some(0.5));
    }

    #[test]
    fn test_correct_only_still_counts_everything() {
        let options = RunOptions {
            filter: DisplayFilter { correct_only: true, wrong_only: false },
            ..RunOptions::default()
        };
        let (summary, rows) = run(options, vec![raw(1, 1, 3), raw(1, 2, 3), raw(2, 2, 4)]);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row[0].starts_with(CORRECT_MARK)));

        let counters = &summary.counters;
        assert_eq!(counters.output_classes.get("yes"), 2);
        assert_eq!(counters.output_classes.get("no"), 1);
        assert_eq!(counters.predicted_classes.get("no"), 2);
        assert_eq!(counters.confusion.total(), 3);
        assert_eq!(counters.confusion.get("❌ \texp:yes \tact:no \tgraph.node.color"), 1);
    }

    #[test]
    fn test_wrong_only_displays_mistakes() {
        let options = RunOptions {
            filter: DisplayFilter { correct_only: false, wrong_only: true },
            ..RunOptions::default()
        };
        let (summary, rows) = run(options, vec![raw(1, 1, 3), raw(1, 2, 3)]);
        assert_eq!(rows.len(), 1);
        assert!(rows[0][0].starts_with(WRONG_MARK));
        assert_eq!(summary.counters.stats.displayed, 1);
    }

    #[test]
    fn test_both_filters_display_nothing_but_count() {
        let options = RunOptions {
            filter: DisplayFilter { correct_only: true, wrong_only: true },
            ..RunOptions::default()
        };
        let records = vec![raw(1, 1, 3), raw(1, 2, 3), raw(2, 1, 4)];
        let (summary, rows) = run(options, records);
        assert!(rows.is_empty());
        assert_eq!(summary.counters.stats.processed, 3);
        assert_eq!(summary.counters.confusion.total(), 3);
    }

    #[test]
    fn test_type_prefix_skips_entirely() {
        let options = RunOptions {
            type_prefix: Some("graph.edge".to_string()),
            ..RunOptions::default()
        };
        let (summary, rows) = run(options, vec![raw(1, 1, 3)]);
        assert!(rows.is_empty());
        assert!(summary.counters.output_classes.is_empty());
        assert!(summary.counters.confusion.is_empty());
        assert_eq!(summary.counters.stats.skipped, 1);
        assert_eq!(summary.counters.stats.processed, 0);

        let options = RunOptions {
            type_prefix: Some("graph.node".to_string()),
            ..RunOptions::default()
        };
        let (summary, rows) = run(options, vec![raw(1, 1, 3)]);
        assert_eq!(rows.len(), 1);
        assert_eq!(summary.counters.output_classes.get("yes"), 1);
    }

    #[test]
    fn test_skipped_records_count_toward_limit() {
        let options = RunOptions {
            limit: 1,
            type_prefix: Some("graph.edge".to_string()),
            ..RunOptions::default()
        };
        let records = vec![raw(1, 1, 3), raw(1, 1, 3), raw(1, 1, 4)];
        let (summary, rows) = run(options, records);
        assert!(rows.is_empty());
        assert_eq!(summary.counters.stats.consumed, 2);
        assert_eq!(summary.counters.stats.skipped, 2);
    }

    #[test]
    fn test_stream_error_propagates() {
        let vocab = vocab();
        let inspector = Inspector::new(Renderer::new(&vocab), RunOptions::default());
        let stream = vec![
            Ok(raw(1, 1, 3)),
            Err(InspectError::shape_mismatch("src", 1, 0)),
            Ok(raw(1, 1, 3)),
        ];
        let mut rows: Vec<Vec<String>> = Vec::new();
        let err = inspector.run(stream, &mut rows).unwrap_err();
        assert!(err.is_shape_mismatch());
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_counters_display() {
        let (summary, _) = run(RunOptions::default(), vec![raw(1, 1, 3), raw(1, 2, 3)]);
        let text = summary.counters.to_string();
        assert!(text.contains("processed 2 of 2 records"));
        assert!(text.contains("accuracy: 50.00%"));
        assert!(text.contains("confusion:"));
    }

    #[test]
    fn test_summary_serializes() {
        let (summary, _) = run(RunOptions::default(), vec![raw(1, 2, 3)]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["counters"]["output_classes"]["yes"], 1);
        assert_eq!(json["counters"]["stats"]["processed"], 1);
        assert!(json["started_at"].is_string());
    }
}
