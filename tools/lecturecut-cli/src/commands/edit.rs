//! Edit a lecture recording into a finished video.

use std::path::PathBuf;
use std::sync::Arc;

use lecturecut_common::config::AppConfig;
use lecturecut_common::error::EditorError;
use lecturecut_render_engine::{run_edit, EditRequest, FfmpegBackend, MediaBackend, SegmentationSource};

pub async fn run(
    mut config: AppConfig,
    video: PathBuf,
    output: PathBuf,
    segmentation: SegmentationSource,
    work_dir: Option<PathBuf>,
    cleanup: bool,
    jobs: Option<usize>,
    report_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(dir) = work_dir {
        config.work_dir = dir;
    }

    let backend = FfmpegBackend::new(config.output.clone());
    if !backend.is_available() {
        anyhow::bail!("ffmpeg and ffprobe are required; run `lecturecut check` for details");
    }

    println!("Editing: {}", video.display());
    match &segmentation {
        SegmentationSource::EventLog(log) => println!("  Event log: {}", log.display()),
        SegmentationSource::Silence => println!(
            "  Segmenting on silences (min {} ms, threshold {} dB)",
            config.editor.min_silence_ms, config.editor.silence_threshold_db
        ),
    }
    println!("  Working directory: {}", config.work_dir.display());

    let request = EditRequest {
        source: video,
        output: output.clone(),
        segmentation,
        cleanup,
        max_workers: jobs,
    };

    let report = match run_edit(Arc::new(backend), &config, request).await {
        Ok(report) => report,
        Err(err) => {
            if let EditorError::IllegalTransition { .. } = err {
                println!("\nThe event log has an impossible sequence; fix it and re-run.");
            }
            return Err(err.into());
        }
    };

    println!();
    print!("{}", report.timeline.summary());
    println!();
    println!("Segments:");
    for segment in &report.segments {
        match segment.speed_ratio {
            Some(ratio) => println!(
                "  {:>3} {:<4} {:>7.2}s  (narration {:.2}s, drawing x{:.2})",
                segment.index, segment.mode, segment.duration_secs, segment.audio_secs, ratio
            ),
            None => println!(
                "  {:>3} {:<4} {:>7.2}s",
                segment.index, segment.mode, segment.duration_secs
            ),
        }
    }
    println!(
        "\nEdit complete: {} ({:.1}s from {:.1}s of recording, took {:.1}s)",
        output.display(),
        report.output_duration_secs(),
        report.source.duration_secs,
        report.elapsed_secs
    );

    if let Some(path) = report_path {
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        println!("Report: {}", path.display());
    }

    Ok(())
}
