use std::{fmt, path::PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// One narration sentence with its slot on the audio timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSegment {
    pub index: usize,
    pub sentence: String,
    pub window: TimeWindow,
}

#[derive(Debug, Clone)]
pub struct NarrationAudio {
    pub path: PathBuf,
    pub duration_seconds: f64,
}

/// A planned segment whose stock clip has been downloaded.
#[derive(Debug, Clone)]
pub struct ResolvedSegment {
    pub index: usize,
    pub phrase: String,
    pub sentence: String,
    pub asset: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedSegment {
    pub index: usize,
    pub phrase: String,
    pub caption: String,
    pub window: TimeWindow,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Resolution,
    Composition,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Resolution => write!(f, "resolution"),
            FailureKind::Composition => write!(f, "composition"),
        }
    }
}

/// A segment that was skipped or dropped without stopping the run.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentFailure {
    pub index: usize,
    pub phrase: Option<String>,
    pub kind: FailureKind,
    pub reason: String,
}

impl fmt::Display for SegmentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.phrase {
            Some(phrase) => write!(
                f,
                "segment {} (\"{}\"): {} failed: {}",
                self.index, phrase, self.kind, self.reason
            ),
            None => write!(f, "segment {}: {} failed: {}", self.index, self.kind, self.reason),
        }
    }
}

/// Result of one pipeline run. `artifact` is `None` when no segment could be composed.
#[derive(Debug, Clone)]
pub struct VideoOutcome {
    pub artifact: Option<PathBuf>,
    pub sentence_count: usize,
    pub segments: Vec<ComposedSegment>,
    pub failures: Vec<SegmentFailure>,
    pub audio_duration: f64,
}

impl VideoOutcome {
    pub fn composed_count(&self) -> usize {
        self.segments.len()
    }

    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &SegmentFailure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }

    /// Seconds of video actually covered by composed segments.
    pub fn video_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.window.duration()).sum()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatementStory {
    #[serde(default)]
    pub bank_name: String,
    pub summary: String,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub categories: Vec<CategoryTotal>,
    #[serde(default)]
    pub financial_advice: String,
    #[serde(default)]
    pub spending_personality: String,
    #[serde(default)]
    pub whatif_scenarios: String,
    pub story: Vec<StoryLine>,
    #[serde(default)]
    pub youtube_search: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub date: String,
    pub merchant: String,
    pub amount: f64,
    #[serde(default)]
    pub location: Option<String>,
}

/// Spend summed over transactions sharing a location.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceTotal {
    pub place: String,
    pub total: f64,
    pub transactions: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryTotal {
    pub name: String,
    pub total: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoryLine {
    pub line: String,
    pub topic: String,
}
