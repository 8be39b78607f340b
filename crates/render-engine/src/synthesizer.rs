//! Segment synthesis.
//!
//! Turns one timeline segment plus its extracted sub-clip into a clip whose
//! audio and video tracks have the same length:
//!
//! - **raw** segments keep their pictures; the audio is cleaned at the cut
//!   points and optionally normalized.
//! - **edit** segments take the narration from the talk interval and retime
//!   the drawing interval to match it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lecturecut_audio::{fade_in, fade_out, normalize, AudioBuffer, AudioFormat, DEFAULT_HEADROOM_DB};
use lecturecut_common::clock::{secs_to_ms, FrameClock};
use lecturecut_common::config::EditorConfig;
use lecturecut_common::error::{EditorError, EditorResult};
use lecturecut_processing_core::palette::{palette_intervals, PaletteProbe};
use lecturecut_processing_core::retime::{plan_retime, remaining_after_cutouts, RetimePlan};
use lecturecut_project_model::timeline::{Interval, Segment};
use lecturecut_project_model::workspace::WorkDir;
use serde::Serialize;

use crate::backend::{MediaBackend, RenderJob};

/// Everything a segment worker needs, shared across workers.
#[derive(Clone)]
pub struct SegmentContext {
    pub backend: Arc<dyn MediaBackend>,
    pub work: WorkDir,
    pub editor: EditorConfig,
    pub audio_format: AudioFormat,
    pub clock: FrameClock,
    pub segment_count: usize,
}

impl SegmentContext {
    fn backend(&self) -> &dyn MediaBackend {
        self.backend.as_ref()
    }
}

/// Result of synthesizing one segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesizedSegment {
    pub index: usize,
    pub mode: &'static str,
    /// Clip with both tracks attached, before stitching.
    pub clip: PathBuf,
    /// Length of `clip`, a whole number of frames.
    pub duration_secs: f64,
    /// Length of the narration before padding to the pictures.
    pub audio_secs: f64,
    /// Visual speed factor (edit segments only).
    pub speed_ratio: Option<f64>,
    pub retime: Option<RetimePlan>,
}

/// Save the last picture of the segment for the next segment's crossfade.
///
/// The frame is read from the extracted sub-clip one frame period before
/// the end of the visual interval, so the seek always lands on a frame.
pub fn save_boundary_frame(
    ctx: &SegmentContext,
    index: usize,
    segment: &Segment,
) -> EditorResult<PathBuf> {
    let clip = ctx.work.video_segment(index);
    if !clip.exists() {
        return Err(EditorError::missing_source(clip));
    }
    let visual_end = segment.visual().end - segment.start();
    let at_secs = (visual_end - ctx.clock.period()).max(0.0);
    let dest = ctx.work.boundary_frame(index);
    ctx.backend().save_frame(&clip, at_secs, &dest)?;
    tracing::debug!(at_secs, path = %dest.display(), "Saved boundary frame");
    Ok(dest)
}

/// Synthesize segment `index` into `retimed{index}.mp4`.
pub fn synthesize(
    ctx: &SegmentContext,
    index: usize,
    segment: &Segment,
) -> EditorResult<SynthesizedSegment> {
    let clip = ctx.work.video_segment(index);
    if !clip.exists() {
        return Err(EditorError::missing_source(clip));
    }

    let temp_audio = ctx.work.temp_audio(index);
    ctx.backend()
        .extract_audio(&clip, ctx.audio_format, &temp_audio)?;
    let source_audio = ctx.backend().read_audio(&temp_audio, ctx.audio_format)?;

    let synthesized = match *segment {
        Segment::Raw { both } => synthesize_raw(ctx, index, both, &clip, source_audio)?,
        Segment::Edit { draw, talk } => {
            synthesize_edit(ctx, index, draw, talk, &clip, source_audio)?
        }
    };

    tracing::info!(
        mode = synthesized.mode,
        duration_secs = synthesized.duration_secs,
        speed_ratio = synthesized.speed_ratio,
        "Segment synthesized"
    );
    Ok(synthesized)
}

fn synthesize_raw(
    ctx: &SegmentContext,
    index: usize,
    both: Interval,
    clip: &Path,
    source_audio: AudioBuffer,
) -> EditorResult<SynthesizedSegment> {
    let editor = &ctx.editor;
    let pre = editor.silence_pre_margin_ms as f64;
    let post = editor.silence_post_margin_ms as f64;
    let duration_ms = secs_to_ms(both.duration());

    let body_end = duration_ms - post;
    if body_end <= pre {
        return Err(EditorError::degenerate(
            index,
            format!("{pre} ms + {post} ms of margins leave no audio in {duration_ms:.0} ms"),
        ));
    }

    let mut audio = source_audio.slice_ms(pre, body_end);
    audio.pad_start_ms(pre);
    audio.pad_end_ms(post);
    if editor.normalise_sound {
        normalize(&mut audio, DEFAULT_HEADROOM_DB);
    }

    let audio_path = ctx.work.audio(index);
    ctx.backend().write_audio(&audio, &audio_path)?;

    let output_secs = ctx.clock.floor_to_frame(both.duration());
    let dest = ctx.work.retimed(index);
    ctx.backend().render(&RenderJob::Remux {
        video: clip.to_path_buf(),
        audio: audio_path,
        output_secs,
        fps: ctx.clock.fps(),
        dest: dest.clone(),
    })?;

    Ok(SynthesizedSegment {
        index,
        mode: "raw",
        clip: dest,
        duration_secs: output_secs,
        audio_secs: audio.duration_secs(),
        speed_ratio: None,
        retime: None,
    })
}

fn synthesize_edit(
    ctx: &SegmentContext,
    index: usize,
    draw: Interval,
    talk: Interval,
    clip: &Path,
    source_audio: AudioBuffer,
) -> EditorResult<SynthesizedSegment> {
    let editor = &ctx.editor;
    if draw.is_empty() {
        return Err(EditorError::degenerate(index, "drawing interval is empty"));
    }

    // Sub-clip starts at the drawing interval.
    let origin = draw.start;
    let talk_rel = talk.relative_to(origin);
    let draw_rel = draw.relative_to(origin);

    let mut narration = source_audio;
    if editor.normalise_sound {
        normalize(&mut narration, DEFAULT_HEADROOM_DB);
    }

    let pre = editor.silence_pre_margin_ms as f64;
    let post = editor.silence_post_margin_ms as f64;
    let start_ms = secs_to_ms(talk_rel.start) + pre;
    let end_ms = secs_to_ms(talk_rel.end) - post;
    if end_ms <= start_ms {
        return Err(EditorError::degenerate(
            index,
            format!(
                "{pre} ms + {post} ms of margins leave no narration in a {:.0} ms talk interval",
                secs_to_ms(talk.duration())
            ),
        ));
    }

    let mut audio = narration.slice_ms(start_ms, end_ms);
    if audio.is_empty() {
        return Err(EditorError::degenerate(
            index,
            format!("sub-clip holds no audio in [{start_ms:.0}, {end_ms:.0}] ms"),
        ));
    }
    fade_in(&mut audio, editor.fade_pre_margin_ms as f64);
    fade_out(&mut audio, editor.fade_post_margin_ms as f64);
    audio.pad_start_ms(pre);
    audio.pad_end_ms(post);

    if index == 0 {
        audio.pad_start_ms(editor.start_video_silence_ms as f64);
    }
    audio.pad_end_ms(editor.silence_between_sections_ms as f64);
    if index + 1 == ctx.segment_count {
        audio.pad_end_ms(editor.end_video_silence_ms as f64);
    }
    let audio_secs = audio.duration_secs();

    let cutouts = if editor.remove_colour_palette {
        palette_cutouts(ctx, clip, draw_rel)?
    } else {
        Vec::new()
    };

    let plan = plan_retime(
        draw.duration(),
        &cutouts,
        editor.extend_last_frame,
        audio_secs,
        editor.max_speedx,
        ctx.clock,
    );
    if plan.audio_pad_secs > 0.0 {
        tracing::warn!(
            speed_ratio = plan.speed_ratio,
            max_speedx = editor.max_speedx,
            audio_pad_secs = plan.audio_pad_secs,
            "Speed-up capped; padding narration to the drawing length"
        );
        audio.pad_end_ms(secs_to_ms(plan.audio_pad_secs));
    }

    let audio_path = ctx.work.audio(index);
    ctx.backend().write_audio(&audio, &audio_path)?;

    let dest = ctx.work.retimed(index);
    ctx.backend().render(&RenderJob::Retime {
        video: clip.to_path_buf(),
        audio: audio_path,
        draw: draw_rel,
        cutouts,
        extension_secs: plan.extension_secs,
        speed_ratio: plan.speed_ratio,
        output_secs: plan.output_secs,
        fps: ctx.clock.fps(),
        dest: dest.clone(),
    })?;

    Ok(SynthesizedSegment {
        index,
        mode: "edit",
        clip: dest,
        duration_secs: plan.output_secs,
        audio_secs,
        speed_ratio: Some(plan.speed_ratio),
        retime: Some(plan),
    })
}

fn palette_cutouts(ctx: &SegmentContext, clip: &Path, draw: Interval) -> EditorResult<Vec<Interval>> {
    let interval = ctx.editor.remove_colour_palette_interval_secs;
    let visible = ctx
        .backend()
        .scan_palette(clip, draw, interval, &PaletteProbe::default())?;
    let cutouts = palette_intervals(&visible, interval, draw.duration());
    if remaining_after_cutouts(draw.duration(), &cutouts) < ctx.clock.period() {
        tracing::warn!(
            cutouts = cutouts.len(),
            "Colour palette covers the whole drawing; keeping it"
        );
        return Ok(Vec::new());
    }
    tracing::debug!(
        sampled = visible.len(),
        cutouts = cutouts.len(),
        "Colour palette scan complete"
    );
    Ok(cutouts)
}
