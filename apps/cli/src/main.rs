use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use spendreel_core::{
    DropPolicy, OpenAiSpeech, PexelsSearch, PipelineConfig, Provider, StatementStory,
    VideoPipeline, YouTubeSearch, clean_downloads, extract_statement_text, extract_story,
    format_outcome, format_story_readable, format_video_suggestions, get_downloads_dir,
    get_root_cache_dir, provider::api_key_from_env,
};

/// Suggested videos shown under the report
const SUGGESTIONS_SHOWN: usize = 3;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Grok,
    Openai,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Grok => Provider::Grok,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Clone, Default, ValueEnum)]
enum CliDropPolicy {
    /// Keep each segment's planned window; the video may end before the audio
    #[default]
    Shrink,
    /// Spread the audio evenly over the segments that made it
    Redistribute,
}

impl From<CliDropPolicy> for DropPolicy {
    fn from(cli: CliDropPolicy) -> Self {
        match cli {
            CliDropPolicy::Shrink => DropPolicy::Shrink,
            CliDropPolicy::Redistribute => DropPolicy::Redistribute,
        }
    }
}

#[derive(Parser)]
#[command(name = "spendreel")]
#[command(about = "Turn a bank statement into a spending story and a narrated stock-footage video")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a statement (PDF or text), print the report and render the story video
    Analyze {
        /// Bank statement file
        statement: PathBuf,

        /// AI provider for story extraction
        #[arg(short, long, default_value = "grok")]
        provider: CliProvider,

        /// Print the report only
        #[arg(long)]
        no_video: bool,

        #[command(flatten)]
        video: VideoArgs,
    },

    /// Render a video from narration text and one topic phrase per sentence
    Video {
        /// Narration text, sentences separated by ". "
        #[arg(long)]
        text: String,

        /// Stock footage search phrase, once per sentence in order
        #[arg(long = "topic", required = true)]
        topics: Vec<String>,

        #[command(flatten)]
        video: VideoArgs,
    },

    /// Delete downloaded stock clips
    Clean,
}

#[derive(Args)]
struct VideoArgs {
    /// Output video path. Defaults to final_output_video.mp4 in the cache directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Segments resolved and composed in parallel
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// Attempts per stock clip search and download
    #[arg(long, default_value_t = 1)]
    attempts: u32,

    /// Deadline in seconds for each HTTP request and ffmpeg invocation
    #[arg(long)]
    timeout: Option<u64>,

    /// What happens to the timeline when a segment is dropped
    #[arg(long, default_value = "shrink")]
    drop_policy: CliDropPolicy,

    /// Font file for captions
    #[arg(long)]
    font: Option<PathBuf>,

    /// Narration voice
    #[arg(long, default_value = "alloy")]
    voice: String,

    /// Keep downloaded clips after the run
    #[arg(long)]
    keep_downloads: bool,
}

impl VideoArgs {
    fn to_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(secs) = self.timeout {
            config.request_timeout = Duration::from_secs(secs);
            config.render_timeout = Duration::from_secs(secs);
        }
        config.concurrency = self.jobs;
        config.max_attempts = self.attempts;
        config.drop_policy = self.drop_policy.clone().into();
        config.caption.font_file = self.font.clone();
        config.voice = self.voice.clone();
        config
    }
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn print_banner(subtitle: &str) {
    println!(
        "\n{}  {}\n",
        style("spendreel").cyan().bold(),
        style(subtitle).dim()
    );
}

fn exit_with_error(e: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", style("Error:").red().bold(), e);
    std::process::exit(1);
}

fn require_video_keys() {
    for env_var in [OpenAiSpeech::ENV_VAR, PexelsSearch::ENV_VAR] {
        if let Err(e) = api_key_from_env(env_var) {
            exit_with_error(e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Analyze {
            statement,
            provider,
            no_video,
            video,
        } => analyze(statement, provider.into(), no_video, video).await,
        Command::Video {
            text,
            topics,
            video,
        } => {
            require_video_keys();
            print_banner("Story Video");
            println!("{}", style("─".repeat(60)).dim());

            let total_start = Instant::now();
            render_video(&video, &text, &topics).await?;
            print_total(total_start);
            Ok(())
        }
        Command::Clean => {
            let downloads = get_downloads_dir(&get_root_cache_dir());
            let removed = clean_downloads(&downloads).await?;
            println!(
                "{} Removed {} downloaded clip(s) from {}",
                style("✓").green().bold(),
                removed,
                style(downloads.display()).dim()
            );
            Ok(())
        }
    }
}

async fn analyze(
    statement: PathBuf,
    provider: Provider,
    no_video: bool,
    video: VideoArgs,
) -> Result<()> {
    // Validate API keys early
    if let Err(e) = provider.validate_api_key() {
        exit_with_error(e);
    }
    if !no_video {
        require_video_keys();
    }

    let config = video.to_config();

    print_banner("Statement Analyzer");
    println!("{}", style("─".repeat(60)).dim());

    let total_start = Instant::now();

    // Step 1: Extract statement text
    let step_start = Instant::now();
    let spinner = create_spinner("Reading statement...");
    let text = extract_statement_text(&statement, config.render_timeout).await?;
    spinner.finish_with_message(format!(
        "{} Statement read: {} chars {}",
        style("✓").green().bold(),
        text.chars().count(),
        style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
    ));

    // Step 2: Story extraction
    let step_start = Instant::now();
    let spinner = create_spinner(&format!("Writing spending story with {}...", provider.name()));
    let client = config.http_client()?;
    let story = extract_story(&client, &provider, &text).await?;
    spinner.finish_with_message(format!(
        "{} Story written ({}): {} lines {}",
        style("✓").green().bold(),
        provider.name(),
        story.story.len(),
        style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
    ));

    println!("{}", style("─".repeat(60)).dim());
    println!("{}", format_story_readable(&story));

    // Step 3: Video suggestions, only when a YouTube key is configured
    if api_key_from_env(YouTubeSearch::ENV_VAR).is_ok() {
        print_suggestions(&client, &story).await;
    }

    if no_video {
        print_total(total_start);
        return Ok(());
    }

    println!("{}", style("─".repeat(60)).dim());
    render_video(&video, &story.narration(), &story.topics()).await?;
    print_total(total_start);

    Ok(())
}

async fn print_suggestions(client: &reqwest::Client, story: &StatementStory) {
    let step_start = Instant::now();
    let spinner = create_spinner("Finding money-saving videos...");

    let links = match YouTubeSearch::from_env(client.clone()) {
        Ok(search) => search.video_links(&story.youtube_search).await,
        Err(e) => Err(e),
    };

    match links {
        Ok(links) => {
            spinner.finish_with_message(format!(
                "{} Video suggestions: {} {}",
                style("✓").green().bold(),
                links.len().min(SUGGESTIONS_SHOWN),
                style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
            ));
            println!(
                "\n{}",
                format_video_suggestions(&story.youtube_search, &links, SUGGESTIONS_SHOWN)
            );
        }
        // Suggestions are extras; the report and video go on without them
        Err(e) => spinner.finish_with_message(format!(
            "{} Video suggestions unavailable: {}",
            style("✗").yellow().bold(),
            style(e).dim()
        )),
    }
}

async fn render_video(args: &VideoArgs, narration: &str, topics: &[String]) -> Result<()> {
    let config = args.to_config();
    let downloads_dir = config.downloads_dir.clone();

    let step_start = Instant::now();
    let spinner = create_spinner(&format!(
        "Generating video for {} topic(s)...",
        topics.len()
    ));
    let pipeline = VideoPipeline::from_env(config)?;
    let outcome = pipeline.generate(narration, topics).await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    match &outcome.artifact {
        Some(_) => spinner.finish_with_message(format!(
            "{} Video assembled: {}/{} segments {}",
            style("✓").green().bold(),
            outcome.composed_count(),
            outcome.sentence_count,
            style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
        )),
        None => spinner.finish_with_message(format!(
            "{} No video: no segment had usable footage {}",
            style("✗").yellow().bold(),
            style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
        )),
    }

    if let Some(path) = &outcome.artifact {
        println!(
            "\n{} {}\n",
            style("Saved:").dim(),
            style(path.display()).cyan()
        );
    }
    println!("{}", format_outcome(&outcome));

    if !args.keep_downloads {
        let removed = clean_downloads(&downloads_dir).await?;
        println!(
            "{} {}",
            style("Cleaned downloads:").dim(),
            style(removed).dim()
        );
    }

    Ok(())
}

fn print_total(start: Instant) {
    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(start.elapsed())).cyan().bold()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_short_and_long_durations() {
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn video_flags_override_defaults() {
        let cli = Cli::parse_from([
            "spendreel",
            "video",
            "--text",
            "A coffee. A bus ride",
            "--topic",
            "coffee",
            "--topic",
            "bus",
            "--jobs",
            "4",
            "--timeout",
            "10",
            "--drop-policy",
            "redistribute",
            "--voice",
            "nova",
        ]);
        let Command::Video { topics, video, .. } = cli.command else {
            panic!("expected video subcommand");
        };

        assert_eq!(topics, vec!["coffee", "bus"]);
        let config = video.to_config();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.render_timeout, Duration::from_secs(10));
        assert_eq!(config.drop_policy, DropPolicy::Redistribute);
        assert_eq!(config.voice, "nova");
        assert!(!video.keep_downloads);
    }

    #[test]
    fn video_requires_a_topic() {
        let result = Cli::try_parse_from(["spendreel", "video", "--text", "Hello"]);
        assert!(result.is_err());
    }

    #[test]
    fn analyze_defaults_to_alloy_voice() {
        let cli = Cli::parse_from(["spendreel", "analyze", "statement.pdf", "--no-video"]);
        let Command::Analyze { no_video, video, .. } = cli.command else {
            panic!("expected analyze subcommand");
        };

        assert!(no_video);
        assert_eq!(video.to_config().voice, "alloy");
    }
}
