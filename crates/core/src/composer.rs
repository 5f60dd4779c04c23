use tracing::{debug, warn};

use crate::{
    render::{ComposeJob, VideoRenderer},
    types::{ComposedSegment, FailureKind, ResolvedSegment, SegmentFailure, TimeWindow},
};

/// Trim one resolved clip to its window and burn in its sentence.
///
/// Failures are returned as data so the caller can drop the segment and carry on.
pub async fn compose_segment(
    renderer: &dyn VideoRenderer,
    segment: &ResolvedSegment,
    window: TimeWindow,
    output: std::path::PathBuf,
) -> Result<ComposedSegment, SegmentFailure> {
    let caption = segment.sentence.trim();
    let job = ComposeJob {
        asset: &segment.asset,
        duration: window.duration(),
        caption,
        output: &output,
    };

    debug!(index = segment.index, phrase = %segment.phrase, duration = job.duration, "composing segment");

    match renderer.compose(&job).await {
        Ok(()) => Ok(ComposedSegment {
            index: segment.index,
            phrase: segment.phrase.clone(),
            caption: caption.to_string(),
            window,
            path: output,
        }),
        Err(e) => {
            warn!(index = segment.index, phrase = %segment.phrase, error = %e, "dropping segment");
            Err(SegmentFailure {
                index: segment.index,
                phrase: Some(segment.phrase.clone()),
                kind: FailureKind::Composition,
                reason: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::{Path, PathBuf},
        time::Duration,
    };

    use async_trait::async_trait;
    use tokio::process::Command;

    use super::*;
    use crate::{error::Result, render::run_tool};

    /// Composition hangs past its deadline.
    struct StalledRenderer;

    #[async_trait]
    impl VideoRenderer for StalledRenderer {
        async fn compose(&self, _job: &ComposeJob<'_>) -> Result<()> {
            let mut command = Command::new("sleep");
            command.arg("5");
            run_tool("ffmpeg", command, Duration::from_millis(100)).await?;
            Ok(())
        }

        async fn concat(&self, _clips: &[PathBuf], _output: &Path) -> Result<()> {
            Ok(())
        }

        async fn mux(&self, _video: &Path, _audio: &Path, _output: &Path) -> Result<()> {
            Ok(())
        }
    }

    /// Records the job and succeeds.
    struct AcceptingRenderer;

    #[async_trait]
    impl VideoRenderer for AcceptingRenderer {
        async fn compose(&self, job: &ComposeJob<'_>) -> Result<()> {
            assert_eq!(job.caption, "Rent took half the budget");
            assert!((job.duration - 2.5).abs() < 1e-9);
            Ok(())
        }

        async fn concat(&self, _clips: &[PathBuf], _output: &Path) -> Result<()> {
            Ok(())
        }

        async fn mux(&self, _video: &Path, _audio: &Path, _output: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn segment() -> ResolvedSegment {
        ResolvedSegment {
            index: 4,
            phrase: "house".to_string(),
            sentence: "  Rent took half the budget ".to_string(),
            asset: PathBuf::from("/tmp/house.mp4"),
        }
    }

    #[tokio::test]
    async fn composed_segment_keeps_window_and_trimmed_caption() {
        let window = TimeWindow { start: 10.0, end: 12.5 };
        let composed = compose_segment(
            &AcceptingRenderer,
            &segment(),
            window,
            PathBuf::from("/tmp/segment_004.mp4"),
        )
        .await
        .unwrap();

        assert_eq!(composed.index, 4);
        assert_eq!(composed.caption, "Rent took half the budget");
        assert_eq!(composed.window, window);
    }

    #[tokio::test]
    async fn timed_out_render_becomes_a_composition_failure() {
        let failure = compose_segment(
            &StalledRenderer,
            &segment(),
            TimeWindow { start: 0.0, end: 3.0 },
            PathBuf::from("/tmp/segment_004.mp4"),
        )
        .await
        .unwrap_err();

        assert_eq!(failure.index, 4);
        assert_eq!(failure.phrase.as_deref(), Some("house"));
        assert_eq!(failure.kind, FailureKind::Composition);
        assert_eq!(failure.reason, "ffmpeg timed out after 100ms");
    }
}
