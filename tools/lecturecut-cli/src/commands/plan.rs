//! Print the timeline for a recording without rendering it.

use std::path::PathBuf;

use lecturecut_common::clock::format_timecode;
use lecturecut_common::config::AppConfig;
use lecturecut_processing_core::interval_machine::build_timeline_from_log;
use lecturecut_project_model::event::load_event_log;
use lecturecut_project_model::timeline::Timeline;
use lecturecut_render_engine::{build_plan, FfmpegBackend, SegmentationSource};

pub fn run(
    config: AppConfig,
    segmentation: SegmentationSource,
    video: Option<PathBuf>,
    duration: Option<f64>,
    json: bool,
) -> anyhow::Result<()> {
    let (duration_secs, timeline) = match (video, duration, segmentation) {
        (Some(video), _, segmentation) => {
            let backend = FfmpegBackend::new(config.output.clone());
            let (info, timeline) = build_plan(&backend, &config, &video, &segmentation)?;
            (info.duration_secs, timeline)
        }
        (None, Some(duration), SegmentationSource::EventLog(log)) => {
            let log = load_event_log(&log)?;
            for skipped in &log.unrecognized {
                println!(
                    "Skipping unknown event '{}' on line {}",
                    skipped.name, skipped.line
                );
            }
            let timeline = build_timeline_from_log(&log, duration)?;
            timeline.validate()?;
            (duration, timeline)
        }
        (None, Some(_), SegmentationSource::Silence) => {
            anyhow::bail!("Silence segmentation needs the recording: pass --video");
        }
        (None, None, _) => anyhow::bail!("Pass --video or --duration"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&timeline)?);
        return Ok(());
    }

    print_plan(&timeline, duration_secs);
    Ok(())
}

fn print_plan(timeline: &Timeline, duration_secs: f64) {
    print!("{}", timeline.summary());
    println!();
    let edits = timeline.iter().filter(|s| s.is_edit()).count();
    println!(
        "{} segment(s): {} edit, {} raw",
        timeline.len(),
        edits,
        timeline.len() - edits
    );

    let gaps = timeline.gaps(duration_secs);
    if !gaps.is_empty() {
        println!("Dropped from the recording:");
        for gap in &gaps {
            println!(
                "  {} - {} ({:.1}s)",
                format_timecode(gap.start),
                format_timecode(gap.end),
                gap.duration()
            );
        }
    }
}
