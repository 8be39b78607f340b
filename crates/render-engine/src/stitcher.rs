//! Crossfade stitching between consecutive segments.
//!
//! Segment `i > 0` opens with a transition: the boundary frame saved by
//! segment `i - 1` is held still while the first `CROSSFADEIN_DURATION`
//! seconds of segment `i` fade in over it. Those seconds are then cut from
//! the head of segment `i`, so the transition replaces them.
//!
//! The boundary frame is handed over with a oneshot channel. The producer
//! sends the frame path once it is on disk; dropping the sender without
//! sending means the producer failed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lecturecut_common::error::{EditorError, EditorResult};
use tokio::sync::oneshot;

use crate::backend::RenderJob;
use crate::synthesizer::{SegmentContext, SynthesizedSegment};

/// Sending half of a boundary-frame handoff.
pub type FrameReady = oneshot::Sender<PathBuf>;

/// Receiving half of a boundary-frame handoff.
pub type FrameWait = oneshot::Receiver<PathBuf>;

/// Wait for segment `index - 1` to publish its boundary frame.
pub async fn await_boundary_frame(
    index: usize,
    frame: FrameWait,
    timeout: Duration,
) -> EditorResult<PathBuf> {
    let dependency = index.saturating_sub(1);
    match tokio::time::timeout(timeout, frame).await {
        Ok(Ok(path)) => Ok(path),
        Ok(Err(_)) => Err(EditorError::missing_dependency(
            index,
            dependency,
            "producer stopped before saving its boundary frame",
        )),
        Err(_) => Err(EditorError::missing_dependency(
            index,
            dependency,
            format!("no boundary frame after {}s", timeout.as_secs_f64()),
        )),
    }
}

/// Produce the final clip(s) of a synthesized segment.
///
/// Returns the files written, in playback order.
pub fn stitch(
    ctx: &SegmentContext,
    segment: &SynthesizedSegment,
    boundary_frame: Option<&Path>,
) -> EditorResult<Vec<PathBuf>> {
    let index = segment.index;
    let output = ctx.work.output(index);

    let Some(image) = boundary_frame else {
        std::fs::rename(&segment.clip, &output)?;
        return Ok(vec![output]);
    };

    let duration = ctx.editor.crossfadein_duration_secs;
    if segment.duration_secs <= duration {
        return Err(EditorError::degenerate(
            index,
            format!(
                "{:.3}s clip is not longer than the {duration}s crossfade",
                segment.duration_secs
            ),
        ));
    }
    if !image.exists() {
        return Err(EditorError::missing_dependency(
            index,
            index.saturating_sub(1),
            format!("{} is not on disk", image.display()),
        ));
    }

    let crossfade = ctx.work.crossfade(index);
    ctx.backend.render(&RenderJob::Crossfade {
        image: image.to_path_buf(),
        video: segment.clip.clone(),
        duration_secs: duration,
        fps: ctx.clock.fps(),
        dest: crossfade.clone(),
    })?;
    ctx.backend.render(&RenderJob::TrimHead {
        video: segment.clip.clone(),
        offset_secs: duration,
        dest: output.clone(),
    })?;

    tracing::debug!(
        crossfade = %crossfade.display(),
        output = %output.display(),
        "Segment stitched"
    );
    Ok(vec![crossfade, output])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frame_arrives() {
        let (tx, rx) = oneshot::channel();
        tx.send(PathBuf::from("/w/last_visual_frame0.jpg")).unwrap();
        let path = await_boundary_frame(1, rx, Duration::from_secs(1)).await.unwrap();
        assert_eq!(path, PathBuf::from("/w/last_visual_frame0.jpg"));
    }

    #[tokio::test]
    async fn test_dropped_producer_is_missing_dependency() {
        let (tx, rx) = oneshot::channel::<PathBuf>();
        drop(tx);
        let err = await_boundary_frame(4, rx, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(
            err,
            EditorError::MissingDependency {
                index: 4,
                dependency: 3,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_silent_producer_times_out() {
        let (_tx, rx) = oneshot::channel::<PathBuf>();
        let err = await_boundary_frame(2, rx, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::MissingDependency { index: 2, .. }));
        assert!(err.to_string().contains("no boundary frame after 0.05s"));
    }
}
