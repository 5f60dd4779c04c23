use std::{
    path::{Path, PathBuf},
    process::Output,
    time::Duration,
};

use async_trait::async_trait;
use tokio::{fs, process::Command};
use tracing::debug;

use crate::{
    config::{CaptionStyle, FrameSpec},
    error::{Result, SpendreelError},
};

/// One clip to trim, normalize and caption.
#[derive(Debug, Clone, Copy)]
pub struct ComposeJob<'a> {
    pub asset: &'a Path,
    pub duration: f64,
    pub caption: &'a str,
    pub output: &'a Path,
}

/// Video operations the pipeline delegates to an external toolkit.
#[async_trait]
pub trait VideoRenderer: Send + Sync {
    async fn compose(&self, job: &ComposeJob<'_>) -> Result<()>;

    /// Join clips in the given order into `output`.
    async fn concat(&self, clips: &[PathBuf], output: &Path) -> Result<()>;

    /// Replace the audio of `video` with `audio`, keeping the audio track whole.
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;
}

pub struct FfmpegRenderer {
    frame: FrameSpec,
    caption: CaptionStyle,
    timeout: Duration,
}

impl FfmpegRenderer {
    pub fn new(frame: FrameSpec, caption: CaptionStyle, timeout: Duration) -> Self {
        Self {
            frame,
            caption,
            timeout,
        }
    }

    fn chars_per_line(&self) -> usize {
        // average glyph is a bit over half the font size wide
        let glyph = self.caption.font_size as f64 * 0.6;
        ((self.frame.width as f64 / glyph).floor() as usize).max(1)
    }

    fn video_filter(&self, caption_file: Option<&Path>) -> String {
        let FrameSpec { width, height, fps } = self.frame;
        let mut filter = format!("scale={width}:{height},setsar=1,fps={fps}");

        if let Some(caption_file) = caption_file {
            let style = &self.caption;
            let bh = style.box_height;
            filter.push_str(&format!(
                ",drawbox=x=0:y=ih-{bh}:w=iw:h={bh}:color={}:t=fill",
                style.background_color
            ));
            filter.push_str(&format!(
                ",drawtext=textfile={}:expansion=none:fontcolor={}:fontsize={}:line_spacing=4:x=(w-text_w)/2:y=h-{bh}+({bh}-text_h)/2",
                escape_filter_value(&caption_file.to_string_lossy()),
                style.text_color,
                style.font_size,
            ));
            if let Some(font) = &style.font_file {
                filter.push_str(&format!(
                    ":fontfile={}",
                    escape_filter_value(&font.to_string_lossy())
                ));
            }
        }

        filter
    }
}

#[async_trait]
impl VideoRenderer for FfmpegRenderer {
    async fn compose(&self, job: &ComposeJob<'_>) -> Result<()> {
        let output = std::path::absolute(job.output)?;
        let caption_lines = wrap_caption(job.caption, self.chars_per_line());

        let caption_file = if caption_lines.is_empty() {
            None
        } else {
            let path = output.with_extension("caption.txt");
            fs::write(&path, caption_lines.join("\n")).await?;
            Some(path)
        };

        let mut command = Command::new("ffmpeg");
        command
            .arg("-y")
            .arg("-stream_loop")
            .arg("-1")
            .arg("-i")
            .arg(job.asset)
            .arg("-t")
            .arg(format!("{:.3}", job.duration))
            .arg("-vf")
            .arg(self.video_filter(caption_file.as_deref()))
            .arg("-an")
            .arg("-c:v")
            .arg("libx264")
            .arg("-preset")
            .arg("veryfast")
            .arg("-pix_fmt")
            .arg("yuv420p")
            .arg("-r")
            .arg(self.frame.fps.to_string())
            .arg(&output);

        let result = run_tool("ffmpeg", command, self.timeout).await;

        if let Some(path) = caption_file {
            let _ = fs::remove_file(path).await;
        }
        result.map(|_| ())
    }

    async fn concat(&self, clips: &[PathBuf], output: &Path) -> Result<()> {
        if clips.is_empty() {
            return Err(SpendreelError::AssemblyFailed {
                output: output.to_path_buf(),
                reason: "no clips to concatenate".to_string(),
            });
        }

        let absolute = clips
            .iter()
            .map(std::path::absolute)
            .collect::<std::io::Result<Vec<_>>>()?;
        let manifest_path = output.with_extension("concat_manifest.txt");
        fs::write(&manifest_path, create_concat_manifest(&absolute)).await?;

        let mut command = Command::new("ffmpeg");
        command
            .arg("-y")
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .arg("-i")
            .arg(&manifest_path)
            .arg("-c")
            .arg("copy")
            .arg(output);

        let result = run_tool("ffmpeg", command, self.timeout).await;
        let _ = fs::remove_file(&manifest_path).await;
        result.map(|_| ())
    }

    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        let mut command = Command::new("ffmpeg");
        command
            .arg("-y")
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .arg("-map")
            .arg("0:v:0")
            .arg("-map")
            .arg("1:a:0")
            .arg("-c:v")
            .arg("copy")
            .arg("-c:a")
            .arg("aac")
            .arg("-b:a")
            .arg("192k")
            .arg(output);

        run_tool("ffmpeg", command, self.timeout).await.map(|_| ())
    }
}

/// Run an external tool to completion within `timeout`, killing it on expiry.
pub(crate) async fn run_tool(
    tool: &'static str,
    mut command: Command,
    timeout: Duration,
) -> Result<Output> {
    command.kill_on_drop(true);
    debug!(tool, "running external tool");

    let output = tokio::time::timeout(timeout, command.output())
        .await
        .map_err(|_| SpendreelError::TimedOut {
            tool,
            after: timeout,
        })??;

    if !output.status.success() {
        return Err(SpendreelError::ToolFailed {
            tool,
            reason: stderr_tail(&output.stderr, 5),
        });
    }

    Ok(output)
}

fn stderr_tail(stderr: &[u8], lines: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let tail: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .rev()
        .take(lines)
        .collect();
    tail.into_iter().rev().collect::<Vec<_>>().join("\n")
}

/// Duration of a media file in seconds, read with ffprobe.
pub async fn probe_duration(path: &Path, timeout: Duration) -> Result<f64> {
    let mut command = Command::new("ffprobe");
    command
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(path);

    let output = run_tool("ffprobe", command, timeout).await?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .trim()
        .parse::<f64>()
        .map_err(|_| SpendreelError::ToolFailed {
            tool: "ffprobe",
            reason: format!("unreadable duration {:?} for {}", stdout.trim(), path.display()),
        })
}

/// Greedy word wrap. Whitespace-only text yields no lines.
pub fn wrap_caption(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Contents of an ffmpeg concat-demuxer manifest, one `file '<path>'` line per clip.
pub fn create_concat_manifest(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .map(|p| format!("file '{}'", p.to_string_lossy().replace('\'', r"'\''")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escape a value for a filter option inside an `-vf` filtergraph.
fn escape_filter_value(value: &str) -> String {
    let mut option_level = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            option_level.push('\\');
        }
        option_level.push(c);
    }

    let mut graph_level = String::with_capacity(option_level.len());
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph_level.push('\\');
        }
        graph_level.push(c);
    }
    graph_level
}
