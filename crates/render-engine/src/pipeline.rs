//! End-to-end editing run.
//!
//! ```text
//! prepare work dir -> probe -> timeline -> extract sub-clips
//!        -> per-segment tasks (boundary frame, synthesize, stitch)
//!        -> concatenate -> optional cleanup
//! ```
//!
//! Each segment runs as its own task. Media work happens on the blocking
//! pool, gated by a semaphore sized to the machine's parallelism. A task
//! holds a permit only while it is doing media work, never while it waits
//! for its predecessor's boundary frame.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lecturecut_audio::{detect_silence, AudioFormat, SilenceSettings};
use lecturecut_common::config::{AppConfig, OutputSettings};
use lecturecut_common::error::{EditorError, EditorResult};
use lecturecut_processing_core::interval_machine::build_timeline_from_log;
use lecturecut_processing_core::silence_segmenter::segments_from_silences;
use lecturecut_project_model::event::load_event_log;
use lecturecut_project_model::timeline::{Segment, Timeline};
use lecturecut_project_model::workspace::WorkDir;
use serde::Serialize;
use tokio::sync::{oneshot, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::backend::{MediaBackend, MediaInfo};
use crate::concat::concatenate;
use crate::stitcher::{await_boundary_frame, stitch, FrameReady, FrameWait};
use crate::synthesizer::{save_boundary_frame, synthesize, SegmentContext, SynthesizedSegment};

/// Where segment boundaries come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentationSource {
    /// Cues recorded alongside the lecture.
    EventLog(PathBuf),
    /// Silences detected in the recording's audio.
    Silence,
}

/// One editing run.
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub source: PathBuf,
    pub output: PathBuf,
    pub segmentation: SegmentationSource,
    /// Remove the working directory after a successful run.
    pub cleanup: bool,
    /// Worker limit; defaults to the available parallelism.
    pub max_workers: Option<usize>,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct EditReport {
    pub output: PathBuf,
    pub source: MediaInfo,
    pub timeline: Timeline,
    pub segments: Vec<SynthesizedSegment>,
    pub elapsed_secs: f64,
}

impl EditReport {
    /// Sum of the final clip lengths, transitions included.
    pub fn output_duration_secs(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_secs).sum()
    }
}

/// Format the whole recording is decoded in for silence detection. Only
/// the level matters, so one low-rate channel keeps an hour of audio small.
pub const SILENCE_DETECTION_FORMAT: AudioFormat = AudioFormat::new(8000, 1);

/// Audio format used for every decode and encode in a run.
pub fn audio_format(settings: &OutputSettings) -> AudioFormat {
    AudioFormat::new(settings.audio_sample_rate, settings.audio_channels)
}

/// Probe the source and build its timeline without rendering anything.
pub fn build_plan(
    backend: &dyn MediaBackend,
    config: &AppConfig,
    source: &Path,
    segmentation: &SegmentationSource,
) -> EditorResult<(MediaInfo, Timeline)> {
    if !source.exists() {
        return Err(EditorError::missing_source(source));
    }
    let info = backend.probe(source)?;

    let timeline = match segmentation {
        SegmentationSource::EventLog(path) => {
            let log = load_event_log(path)?;
            build_timeline_from_log(&log, info.duration_secs)?
        }
        SegmentationSource::Silence => {
            let work = WorkDir::new(&config.work_dir);
            std::fs::create_dir_all(work.root())?;
            let audio_path = work.source_audio();
            backend.extract_audio(source, SILENCE_DETECTION_FORMAT, &audio_path)?;
            let audio = backend.read_audio(&audio_path, SILENCE_DETECTION_FORMAT)?;
            let settings = SilenceSettings {
                min_silence_ms: config.editor.min_silence_ms,
                threshold_db: config.editor.silence_threshold_db,
                ..SilenceSettings::default()
            };
            let silences = detect_silence(&audio, &settings);
            segments_from_silences(&silences, info.duration_secs)?
        }
    };
    timeline.validate()?;
    Ok((info, timeline))
}

/// Run a full edit: timeline, synthesis, stitching, concatenation.
pub async fn run_edit(
    backend: Arc<dyn MediaBackend>,
    config: &AppConfig,
    request: EditRequest,
) -> EditorResult<EditReport> {
    let started = std::time::Instant::now();
    config.editor.validate()?;

    let work = WorkDir::new(&config.work_dir);
    work.prepare()?;
    tracing::info!(
        source = %request.source.display(),
        work_dir = %work.root().display(),
        backend = backend.name(),
        "Starting edit"
    );

    let (info, timeline) = {
        let backend = backend.clone();
        let config = config.clone();
        let source = request.source.clone();
        let segmentation = request.segmentation.clone();
        run_blocking(move || build_plan(backend.as_ref(), &config, &source, &segmentation)).await?
    };
    tracing::info!(
        segments = timeline.len(),
        duration_secs = info.duration_secs,
        fps = info.fps,
        "Timeline ready\n{}",
        timeline.summary()
    );

    {
        let backend = backend.clone();
        let work = work.clone();
        let source = request.source.clone();
        let segments = timeline.segments.clone();
        run_blocking(move || extract_segments(backend.as_ref(), &work, &source, &segments)).await?;
    }

    let ctx = Arc::new(SegmentContext {
        backend: backend.clone(),
        work: work.clone(),
        editor: config.editor.clone(),
        audio_format: audio_format(&config.output),
        clock: info.clock(),
        segment_count: timeline.len(),
    });
    let workers = request.max_workers.unwrap_or_else(default_parallelism).max(1);
    let segments = process_segments(ctx, &timeline.segments, workers).await?;

    {
        let backend = backend.clone();
        let work = work.clone();
        let output = request.output.clone();
        let count = segments.len();
        run_blocking(move || concatenate(backend.as_ref(), &work, count, &output)).await?;
    }

    if request.cleanup {
        work.cleanup()?;
        tracing::debug!(work_dir = %work.root().display(), "Working directory removed");
    }

    let elapsed_secs = started.elapsed().as_secs_f64();
    tracing::info!(
        output = %request.output.display(),
        segments = segments.len(),
        elapsed_secs,
        "Edit finished"
    );
    Ok(EditReport {
        output: request.output,
        source: info,
        timeline,
        segments,
        elapsed_secs,
    })
}

/// Cut each segment's source span into its own sub-clip.
fn extract_segments(
    backend: &dyn MediaBackend,
    work: &WorkDir,
    source: &Path,
    segments: &[Segment],
) -> EditorResult<()> {
    for (index, segment) in segments.iter().enumerate() {
        let dest = work.video_segment(index);
        backend.extract_clip(source, segment.source_span(), &dest)?;
        tracing::debug!(index, span = ?segment.source_span(), "Extracted sub-clip");
    }
    Ok(())
}

/// Fan out one task per segment and collect their results in index order.
async fn process_segments(
    ctx: Arc<SegmentContext>,
    segments: &[Segment],
    workers: usize,
) -> EditorResult<Vec<SynthesizedSegment>> {
    let permits = Arc::new(Semaphore::new(workers));
    let mut senders = Vec::with_capacity(segments.len());
    let mut receivers = Vec::with_capacity(segments.len());
    for _ in segments {
        let (tx, rx) = oneshot::channel();
        senders.push(tx);
        receivers.push(Some(rx));
    }

    let mut tasks = JoinSet::new();
    let mut results: Vec<Option<SynthesizedSegment>> = vec![None; segments.len()];
    for (index, (segment, frame_ready)) in segments.iter().copied().zip(senders).enumerate() {
        // Stop spawning as soon as an earlier segment has failed.
        while let Some(joined) = tasks.try_join_next() {
            if let Err(err) = record_joined(joined, &mut results) {
                tasks.abort_all();
                return Err(err);
            }
        }

        let predecessor = match index {
            0 => None,
            _ => receivers[index - 1].take(),
        };
        // Permits are taken in index order so a predecessor always starts first.
        let permit = permits
            .clone()
            .acquire_owned()
            .await
            .map_err(anyhow::Error::new)?;
        let span = tracing::info_span!("segment", index, mode = segment.mode_name());
        tasks.spawn(
            process_segment(
                ctx.clone(),
                permits.clone(),
                permit,
                index,
                segment,
                frame_ready,
                predecessor,
            )
            .instrument(span),
        );
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = record_joined(joined, &mut results) {
            tasks.abort_all();
            return Err(err);
        }
    }

    results
        .into_iter()
        .enumerate()
        .map(|(index, result)| {
            result.ok_or_else(|| EditorError::missing_input(format!("Segment {index} produced no output")))
        })
        .collect()
}

/// Store a finished task's segment, or surface its failure.
fn record_joined(
    joined: Result<EditorResult<SynthesizedSegment>, tokio::task::JoinError>,
    results: &mut [Option<SynthesizedSegment>],
) -> EditorResult<()> {
    match joined {
        Ok(Ok(segment)) => {
            let index = segment.index;
            results[index] = Some(segment);
            Ok(())
        }
        Ok(Err(err)) => Err(err),
        Err(join_err) => Err(anyhow::Error::new(join_err)
            .context("Segment task failed")
            .into()),
    }
}

async fn process_segment(
    ctx: Arc<SegmentContext>,
    permits: Arc<Semaphore>,
    permit: OwnedSemaphorePermit,
    index: usize,
    segment: Segment,
    frame_ready: FrameReady,
    predecessor: Option<FrameWait>,
) -> EditorResult<SynthesizedSegment> {
    let frame = {
        let ctx = ctx.clone();
        run_blocking(move || save_boundary_frame(&ctx, index, &segment)).await?
    };
    // The successor may already have failed and dropped its receiver.
    let _ = frame_ready.send(frame);

    let synthesized = {
        let ctx = ctx.clone();
        run_blocking(move || synthesize(&ctx, index, &segment)).await?
    };
    drop(permit);

    let image = match predecessor {
        Some(wait) => {
            Some(await_boundary_frame(index, wait, ctx.editor.missing_image_timeout()).await?)
        }
        None => None,
    };

    let _permit = permits.acquire_owned().await.map_err(anyhow::Error::new)?;
    let stitched = synthesized.clone();
    let outputs = run_blocking(move || stitch(&ctx, &stitched, image.as_deref())).await?;
    tracing::info!(outputs = outputs.len(), "Segment complete");
    Ok(synthesized)
}

/// Run blocking media work off the async executor.
async fn run_blocking<T, F>(work: F) -> EditorResult<T>
where
    F: FnOnce() -> EditorResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(err) => Err(anyhow::Error::new(err)
            .context("Media worker panicked")
            .into()),
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
