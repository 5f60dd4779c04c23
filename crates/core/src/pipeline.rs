use std::{collections::HashSet, path::Path};

use futures::{StreamExt, stream};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    assembler::assemble,
    cache::{get_concat_path, get_narration_path, get_run_dir, get_segment_path},
    composer::compose_segment,
    config::{DropPolicy, PipelineConfig},
    error::{Result, SpendreelError},
    narration::{NarrationSynthesizer, OpenAiSpeech},
    planner::{equal_windows, plan_segments},
    render::{FfmpegRenderer, VideoRenderer},
    resolver::{AssetResolver, FileFetcher, HttpFetcher, MediaSearch, PexelsSearch},
    types::{
        ComposedSegment, FailureKind, PlannedSegment, ResolvedSegment, SegmentFailure, TimeWindow,
        VideoOutcome,
    },
};

/// Narrated stock-footage video from a story and one topic phrase per sentence.
pub struct VideoPipeline {
    config: PipelineConfig,
    synthesizer: Box<dyn NarrationSynthesizer>,
    search: Box<dyn MediaSearch>,
    fetcher: Box<dyn FileFetcher>,
    renderer: Box<dyn VideoRenderer>,
}

impl VideoPipeline {
    pub fn new(
        config: PipelineConfig,
        synthesizer: Box<dyn NarrationSynthesizer>,
        search: Box<dyn MediaSearch>,
        fetcher: Box<dyn FileFetcher>,
        renderer: Box<dyn VideoRenderer>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            synthesizer,
            search,
            fetcher,
            renderer,
        })
    }

    /// Live services: OpenAI speech, Pexels search, HTTP downloads, ffmpeg.
    pub fn from_env(config: PipelineConfig) -> Result<Self> {
        let client = config.http_client()?;
        let synthesizer = OpenAiSpeech::from_env(client.clone(), config.render_timeout)?
            .with_voice(config.voice.clone());
        let search = PexelsSearch::from_env(client.clone())?;
        let fetcher = HttpFetcher::new(client);
        let renderer = FfmpegRenderer::new(
            config.frame,
            config.caption.clone(),
            config.render_timeout,
        );

        Self::new(
            config,
            Box::new(synthesizer),
            Box::new(search),
            Box::new(fetcher),
            Box::new(renderer),
        )
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the whole pipeline once.
    ///
    /// Per-segment problems end up in [`VideoOutcome::failures`]; only invalid input,
    /// narration synthesis and final assembly abort the run.
    pub async fn generate(&self, narrative: &str, topics: &[String]) -> Result<VideoOutcome> {
        if narrative.trim().is_empty() {
            return Err(SpendreelError::invalid_input("narration text is empty"));
        }

        let run_dir = get_run_dir(&self.config.work_dir, Uuid::new_v4());
        fs::create_dir_all(&run_dir).await?;

        let result = self.run(narrative, topics, &run_dir).await;

        if let Err(e) = fs::remove_dir_all(&run_dir).await {
            warn!(path = %run_dir.display(), error = %e, "failed to remove run directory");
        }
        result
    }

    async fn run(&self, narrative: &str, topics: &[String], run_dir: &Path) -> Result<VideoOutcome> {
        let narration = self
            .synthesizer
            .synthesize(narrative, &get_narration_path(run_dir))
            .await?;

        let plan = plan_segments(narrative, narration.duration_seconds)?;
        info!(
            sentences = plan.len(),
            topics = topics.len(),
            duration = narration.duration_seconds,
            "segments planned"
        );
        if topics.len() != plan.len() {
            warn!(
                sentences = plan.len(),
                topics = topics.len(),
                "topic count does not match sentence count"
            );
        }

        let mut failures = Vec::new();
        let resolved = self.resolve_all(&plan, topics, &mut failures).await;
        let segments = self
            .compose_all(
                &plan,
                resolved,
                narration.duration_seconds,
                run_dir,
                &mut failures,
            )
            .await;
        failures.sort_by_key(|f| f.index);

        let artifact = assemble(
            self.renderer.as_ref(),
            &segments,
            &narration.path,
            &get_concat_path(run_dir),
            &self.config.output_path,
        )
        .await?;

        Ok(VideoOutcome {
            artifact,
            sentence_count: plan.len(),
            segments,
            failures,
            audio_duration: narration.duration_seconds,
        })
    }

    async fn resolve_all(
        &self,
        plan: &[PlannedSegment],
        topics: &[String],
        failures: &mut Vec<SegmentFailure>,
    ) -> Vec<ResolvedSegment> {
        let resolver = AssetResolver::new(
            self.search.as_ref(),
            self.fetcher.as_ref(),
            &self.config.downloads_dir,
        )
        .with_retries(self.config.max_attempts, self.config.retry_delay);
        let resolver = &resolver;

        let results: Vec<_> = stream::iter(plan)
            .map(move |segment| async move {
                let phrase = topics.get(segment.index).map(|t| t.trim().to_string());
                let outcome = match phrase.as_deref() {
                    None => Err("no topic phrase supplied for this sentence".to_string()),
                    Some("") => Err("topic phrase is empty".to_string()),
                    Some(p) => match resolver.resolve(p).await {
                        Ok(Some(asset)) => Ok(asset),
                        Ok(None) => Err(format!("no clip found for \"{}\"", p)),
                        Err(e) => Err(format!("resolution failed for phrase \"{}\": {}", p, e)),
                    },
                };
                (segment, phrase, outcome)
            })
            .buffered(self.config.concurrency)
            .collect()
            .await;

        let mut resolved = Vec::new();
        for (segment, phrase, outcome) in results {
            match (phrase, outcome) {
                (Some(phrase), Ok(asset)) => resolved.push(ResolvedSegment {
                    index: segment.index,
                    phrase,
                    sentence: segment.sentence.clone(),
                    asset,
                }),
                (phrase, outcome) => {
                    let reason = outcome.err().unwrap_or_default();
                    warn!(index = segment.index, phrase = ?phrase, %reason, "skipping segment");
                    failures.push(SegmentFailure {
                        index: segment.index,
                        phrase,
                        kind: FailureKind::Resolution,
                        reason,
                    });
                }
            }
        }

        resolved
    }

    async fn compose_all(
        &self,
        plan: &[PlannedSegment],
        mut survivors: Vec<ResolvedSegment>,
        duration: f64,
        run_dir: &Path,
        failures: &mut Vec<SegmentFailure>,
    ) -> Vec<ComposedSegment> {
        let renderer = self.renderer.as_ref();

        loop {
            let windows: Vec<TimeWindow> = match self.config.drop_policy {
                DropPolicy::Shrink => survivors.iter().map(|s| plan[s.index].window).collect(),
                DropPolicy::Redistribute => equal_windows(duration, survivors.len()),
            };

            let results: Vec<_> = stream::iter(survivors.iter().zip(windows))
                .map(move |(segment, window)| {
                    compose_segment(
                        renderer,
                        segment,
                        window,
                        get_segment_path(run_dir, segment.index),
                    )
                })
                .buffered(self.config.concurrency)
                .collect()
                .await;

            let mut composed = Vec::with_capacity(results.len());
            let mut dropped = false;
            for result in results {
                match result {
                    Ok(segment) => composed.push(segment),
                    Err(failure) => {
                        failures.push(failure);
                        dropped = true;
                    }
                }
            }

            if !dropped || composed.is_empty() || self.config.drop_policy == DropPolicy::Shrink {
                return composed;
            }

            // Each pass removes at least one segment, so this terminates.
            let kept: HashSet<usize> = composed.iter().map(|s| s.index).collect();
            survivors.retain(|s| kept.contains(&s.index));
            info!(
                survivors = survivors.len(),
                "recomposing survivors with redistributed windows"
            );
        }
    }
}
