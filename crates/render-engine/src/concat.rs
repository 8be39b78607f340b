//! Final assembly of per-segment clips.

use std::path::{Path, PathBuf};

use lecturecut_common::error::{EditorError, EditorResult};
use lecturecut_project_model::workspace::WorkDir;

use crate::backend::MediaBackend;

/// Render the body of an ffmpeg concat list.
///
/// Single quotes in paths are closed, escaped, and reopened (`'\''`).
pub fn concat_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| {
            let escaped = path.to_string_lossy().replace('\'', "'\\''");
            format!("file '{escaped}'\n")
        })
        .collect()
}

/// Join `segment_count` finished segments into `dest`.
///
/// Every clip must exist; the first missing one is reported.
pub fn concatenate(
    backend: &dyn MediaBackend,
    work: &WorkDir,
    segment_count: usize,
    dest: &Path,
) -> EditorResult<()> {
    let clips = work.playback_order(segment_count);
    if clips.is_empty() {
        return Err(EditorError::missing_input("No clips to concatenate"));
    }
    if let Some(missing) = clips.iter().find(|clip| !clip.exists()) {
        return Err(EditorError::missing_source(missing));
    }

    let list_path = work.concat_list();
    std::fs::write(&list_path, concat_list(&clips))?;

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(
        clips = clips.len(),
        output = %dest.display(),
        "Concatenating segments"
    );
    backend.concat(&list_path, dest)
}
