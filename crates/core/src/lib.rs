//! Spendreel Core Library
//!
//! Turns a bank statement into a spending story and a short narrated video
//! assembled from stock footage matched to each sentence.

pub mod assembler;
pub mod cache;
pub mod composer;
pub mod config;
pub mod error;
pub mod format;
pub mod ingest;
pub mod narration;
pub mod pipeline;
pub mod planner;
pub mod provider;
pub mod render;
pub mod resolver;
pub mod story;
pub mod types;
pub mod youtube;

#[cfg(test)]
mod testing;

// Re-export commonly used items at crate root
pub use cache::{get_downloads_dir, get_root_cache_dir};
pub use config::{CaptionStyle, DropPolicy, FrameSpec, PipelineConfig};
pub use error::{Result, SpendreelError};
pub use format::{
    format_outcome, format_story_readable, format_timestamp, format_video_suggestions,
};
pub use ingest::extract_statement_text;
pub use narration::{NarrationSynthesizer, OpenAiSpeech};
pub use pipeline::VideoPipeline;
pub use planner::{equal_windows, plan_segments, split_sentences};
pub use provider::{Provider, ProviderConfig};
pub use render::{ComposeJob, FfmpegRenderer, VideoRenderer};
pub use resolver::{FileFetcher, HttpFetcher, MediaSearch, PexelsSearch, clean_downloads};
pub use story::{extract_story, parse_story};
pub use types::{
    ComposedSegment, FailureKind, NarrationAudio, PlaceTotal, PlannedSegment, SegmentFailure,
    StatementStory, TimeWindow, VideoOutcome,
};
pub use youtube::YouTubeSearch;
