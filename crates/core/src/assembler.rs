use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::{
    error::{Result, SpendreelError},
    render::VideoRenderer,
    types::ComposedSegment,
};

/// Concatenate composed segments and lay the narration over them.
///
/// Returns `Ok(None)` without writing anything when there is nothing to assemble.
pub async fn assemble(
    renderer: &dyn VideoRenderer,
    segments: &[ComposedSegment],
    narration: &Path,
    scratch: &Path,
    output: &Path,
) -> Result<Option<PathBuf>> {
    if segments.is_empty() {
        info!("no composed segments, skipping assembly");
        return Ok(None);
    }

    let clips: Vec<PathBuf> = segments.iter().map(|s| s.path.clone()).collect();

    renderer
        .concat(&clips, scratch)
        .await
        .map_err(|e| assembly_failed(scratch, e))?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).await?;
    }
    renderer
        .mux(scratch, narration, output)
        .await
        .map_err(|e| assembly_failed(output, e))?;

    info!(path = %output.display(), segments = segments.len(), "video assembled");
    Ok(Some(output.to_path_buf()))
}

fn assembly_failed(output: &Path, e: SpendreelError) -> SpendreelError {
    match e {
        SpendreelError::AssemblyFailed { .. } => e,
        other => SpendreelError::AssemblyFailed {
            output: output.to_path_buf(),
            reason: other.to_string(),
        },
    }
}
