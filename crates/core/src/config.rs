use std::{path::PathBuf, time::Duration};

use crate::{
    cache::{get_default_output_path, get_downloads_dir, get_root_cache_dir},
    error::{Result, SpendreelError},
    narration::DEFAULT_VOICE,
};

/// What happens to the time windows of surviving segments when others are dropped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DropPolicy {
    /// Survivors keep their planned windows; the video ends early.
    #[default]
    Shrink,
    /// Windows are re-planned evenly over the survivors.
    Redistribute,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSpec {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptionStyle {
    pub box_height: u32,
    pub font_size: u32,
    pub font_file: Option<PathBuf>,
    pub text_color: String,
    pub background_color: String,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            box_height: 100,
            font_size: 28,
            font_file: None,
            text_color: "white".to_string(),
            background_color: "black".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Root for per-run scratch directories
    pub work_dir: PathBuf,
    pub downloads_dir: PathBuf,
    pub output_path: PathBuf,
    pub frame: FrameSpec,
    pub caption: CaptionStyle,
    /// Text-to-speech voice for the narration
    pub voice: String,
    /// Deadline for each HTTP request
    pub request_timeout: Duration,
    /// Deadline for each external tool invocation (ffmpeg, ffprobe, pdftotext)
    pub render_timeout: Duration,
    /// Attempts per asset resolution, including the first one
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// Segments resolved and composed at the same time
    pub concurrency: usize,
    pub drop_policy: DropPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let root = get_root_cache_dir();
        Self {
            downloads_dir: get_downloads_dir(&root),
            output_path: get_default_output_path(&root),
            work_dir: root,
            frame: FrameSpec::default(),
            caption: CaptionStyle::default(),
            voice: DEFAULT_VOICE.to_string(),
            request_timeout: Duration::from_secs(60),
            render_timeout: Duration::from_secs(300),
            max_attempts: 1,
            retry_delay: Duration::from_millis(500),
            concurrency: 1,
            drop_policy: DropPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Config rooted at `root` instead of the user cache directory.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            downloads_dir: get_downloads_dir(&root),
            output_path: get_default_output_path(&root),
            work_dir: root,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Err(SpendreelError::invalid_input(reason));

        if self.frame.width == 0 || self.frame.height == 0 || self.frame.fps == 0 {
            return invalid("frame width, height and fps must be > 0");
        }
        // libx264 with yuv420p rejects odd dimensions
        if self.frame.width % 2 != 0 || self.frame.height % 2 != 0 {
            return invalid("frame width and height must be even");
        }
        if self.caption.box_height == 0 || self.caption.box_height > self.frame.height {
            return invalid("caption box height must be within the frame height");
        }
        if self.caption.font_size == 0 {
            return invalid("caption font size must be > 0");
        }
        if self.voice.trim().is_empty() {
            return invalid("narration voice must not be empty");
        }
        if self.max_attempts == 0 {
            return invalid("max_attempts must be > 0");
        }
        if self.concurrency == 0 {
            return invalid("concurrency must be > 0");
        }
        if self.request_timeout.is_zero() || self.render_timeout.is_zero() {
            return invalid("timeouts must be > 0");
        }
        Ok(())
    }

    /// HTTP client shared by every network collaborator, bounded by `request_timeout`.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn blank_voice_is_rejected() {
        let config = PipelineConfig {
            voice: " ".to_string(),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SpendreelError::InvalidInput { .. })
        ));
    }

    #[test]
    fn rooted_config_keeps_everything_under_root() {
        let config = PipelineConfig::rooted_at("/srv/reel");
        assert_eq!(config.downloads_dir, PathBuf::from("/srv/reel/downloads"));
        assert_eq!(
            config.output_path,
            PathBuf::from("/srv/reel/final_output_video.mp4")
        );
    }

    #[test]
    fn rejects_zero_concurrency_and_attempts() {
        let mut config = PipelineConfig::default();
        config.concurrency = 0;
        assert!(matches!(
            config.validate(),
            Err(SpendreelError::InvalidInput { .. })
        ));

        let mut config = PipelineConfig::default();
        config.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_odd_frame_and_oversized_caption() {
        let mut config = PipelineConfig::default();
        config.frame.width = 1281;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.caption.box_height = 721;
        assert!(config.validate().is_err());
    }
}
