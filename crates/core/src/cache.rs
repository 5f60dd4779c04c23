use std::path::{Path, PathBuf};

use uuid::Uuid;

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("spendreel")
}

/// Directory holding downloaded stock clips, shared across runs until cleaned
pub fn get_downloads_dir(root: &Path) -> PathBuf {
    root.join("downloads")
}

/// Scratch directory for one pipeline run
pub fn get_run_dir(root: &Path, run_id: Uuid) -> PathBuf {
    root.join("runs").join(run_id.to_string())
}

pub fn get_default_output_path(root: &Path) -> PathBuf {
    root.join("final_output_video.mp4")
}

pub fn get_narration_path(run_dir: &Path) -> PathBuf {
    run_dir.join("narration.mp3")
}

pub fn get_segment_path(run_dir: &Path, index: usize) -> PathBuf {
    run_dir.join(format!("segment_{:03}.mp4", index))
}

pub fn get_concat_path(run_dir: &Path) -> PathBuf {
    run_dir.join("concatenated.mp4")
}
