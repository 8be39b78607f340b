mod common;

use std::path::Path;
use std::sync::Arc;

use common::{approx, fixture_log, scratch_dir, test_config, tone, FakeBackend};
use lecturecut_audio::{AudioBuffer, AudioFormat};
use lecturecut_common::error::EditorError;
use lecturecut_project_model::timeline::{Interval, Segment};
use lecturecut_project_model::workspace::WorkDir;
use lecturecut_render_engine::{
    build_plan, run_edit, EditRequest, RenderJob, SegmentationSource, SILENCE_DETECTION_FORMAT,
};

fn request(scratch: &Path, segmentation: SegmentationSource) -> EditRequest {
    EditRequest {
        source: scratch.join("lecture.mp4"),
        output: scratch.join("edited.mp4"),
        segmentation,
        cleanup: false,
        max_workers: Some(2),
    }
}

fn log_request(scratch: &Path, log: &str) -> EditRequest {
    request(scratch, SegmentationSource::EventLog(fixture_log(log)))
}

#[tokio::test]
async fn single_section_is_retimed_to_its_narration() {
    let scratch = scratch_dir("single_section");
    let config = test_config(&scratch);
    let fake = Arc::new(FakeBackend::new(&scratch.join("lecture.mp4"), 10.0));

    let report = run_edit(fake.clone(), &config, log_request(&scratch, "single_section.log"))
        .await
        .expect("edit should succeed");

    assert_eq!(
        report.timeline.segments,
        vec![Segment::edit(Interval::new(0.0, 3.0), Interval::new(3.0, 8.0))]
    );

    // Talk [3, 8] trimmed to [3.3, 7.7], re-padded to 5.0s, plus the
    // 0.5s opening and 1.0s closing silence of a single-segment video.
    let work = WorkDir::new(&config.work_dir);
    let audio_secs = fake.written_audio_secs(&work.audio(0)).unwrap();
    assert!(approx(audio_secs, 6.5), "audio was {audio_secs}s");

    let jobs = fake.jobs();
    assert_eq!(jobs.len(), 1);
    match &jobs[0] {
        RenderJob::Retime {
            draw,
            speed_ratio,
            output_secs,
            cutouts,
            extension_secs,
            ..
        } => {
            assert_eq!(*draw, Interval::new(0.0, 3.0));
            assert!(approx(*speed_ratio, 3.0 / 6.5));
            assert!(approx(*output_secs, 6.5));
            assert!(cutouts.is_empty());
            assert_eq!(*extension_secs, 0.0);
        }
        other => panic!("expected a retime job, got {other:?}"),
    }

    assert!(work.output(0).exists());
    assert!(report.output.exists());
    assert_eq!(
        fake.concat_lists(),
        vec![format!("file '{}'\n", work.output(0).display())]
    );
    assert!(approx(report.output_duration_secs(), 6.5));
}

#[tokio::test]
async fn later_segments_open_with_a_crossfade() {
    let scratch = scratch_dir("two_sections");
    let config = test_config(&scratch);
    let fake = Arc::new(FakeBackend::new(&scratch.join("lecture.mp4"), 15.0));

    let report = run_edit(fake.clone(), &config, log_request(&scratch, "two_sections.log"))
        .await
        .expect("edit should succeed");
    assert_eq!(report.segments.len(), 2);

    let work = WorkDir::new(&config.work_dir);
    let jobs = fake.jobs();
    let crossfade = jobs
        .iter()
        .find_map(|job| match job {
            RenderJob::Crossfade {
                image,
                video,
                duration_secs,
                dest,
                ..
            } => Some((image.clone(), video.clone(), *duration_secs, dest.clone())),
            _ => None,
        })
        .expect("segment 1 needs a crossfade");
    assert_eq!(crossfade.0, work.boundary_frame(0));
    assert_eq!(crossfade.1, work.retimed(1));
    assert!(approx(crossfade.2, 1.5));
    assert_eq!(crossfade.3, work.crossfade(1));

    assert!(jobs.iter().any(|job| matches!(
        job,
        RenderJob::TrimHead { offset_secs, dest, .. } if approx(*offset_secs, 1.5) && *dest == work.output(1)
    )));

    let expected: String = work
        .playback_order(2)
        .iter()
        .map(|p| format!("file '{}'\n", p.display()))
        .collect();
    assert_eq!(fake.concat_lists(), vec![expected]);

    // Only the first segment gets the opening silence, only the last the closing one.
    assert!(approx(fake.written_audio_secs(&work.audio(0)).unwrap(), 5.5));
    assert!(approx(fake.written_audio_secs(&work.audio(1)).unwrap(), 6.0));
}

#[tokio::test]
async fn raw_and_edit_segments_mix() {
    let scratch = scratch_dir("mixed");
    let config = test_config(&scratch);
    let fake = Arc::new(FakeBackend::new(&scratch.join("lecture.mp4"), 12.0));

    let report = run_edit(fake.clone(), &config, log_request(&scratch, "mixed.log"))
        .await
        .expect("edit should succeed");

    assert_eq!(
        report.timeline.segments,
        vec![
            Segment::raw(Interval::new(0.0, 4.0)),
            Segment::edit(Interval::new(4.0, 7.0), Interval::new(7.0, 12.0)),
        ]
    );
    assert_eq!(report.segments[0].mode, "raw");
    assert!(approx(report.segments[0].duration_secs, 4.0));
    assert_eq!(report.segments[0].speed_ratio, None);

    let work = WorkDir::new(&config.work_dir);
    assert!(approx(fake.written_audio_secs(&work.audio(0)).unwrap(), 4.0));
    assert!(fake
        .jobs()
        .iter()
        .any(|job| matches!(job, RenderJob::Remux { output_secs, .. } if approx(*output_secs, 4.0))));
}

#[tokio::test]
async fn redrawn_section_renders_from_the_last_draw() {
    let scratch = scratch_dir("redraw");
    let config = test_config(&scratch);
    let fake = Arc::new(FakeBackend::new(&scratch.join("lecture.mp4"), 12.0));

    let report = run_edit(fake.clone(), &config, log_request(&scratch, "redraw.log"))
        .await
        .expect("a redraw should render");

    assert_eq!(
        report.timeline.segments,
        vec![Segment::edit(Interval::new(2.0, 5.0), Interval::new(5.0, 10.0))]
    );
    assert_eq!(report.segments.len(), 1);
    assert!(approx(report.segments[0].speed_ratio.unwrap(), 3.0 / 6.5));
    assert!(fake.jobs().iter().any(|job| matches!(
        job,
        RenderJob::Retime { draw, .. } if *draw == Interval::new(0.0, 3.0)
    )));
    assert!(report.output.exists());
}

#[tokio::test]
async fn speed_cap_pads_the_narration() {
    let scratch = scratch_dir("speed_cap");
    let config = test_config(&scratch);
    let fake = Arc::new(FakeBackend::new(&scratch.join("lecture.mp4"), 65.0));

    let report = run_edit(fake.clone(), &config, log_request(&scratch, "long_drawing.log"))
        .await
        .expect("edit should succeed");

    let segment = &report.segments[0];
    assert!(approx(segment.speed_ratio.unwrap(), config.editor.max_speedx));
    // 60s of drawing at 5x lasts 12s; the 6.5s of narration is padded to match.
    assert!(approx(segment.duration_secs, 12.0));
    assert!(approx(segment.audio_secs, 6.5));
    let work = WorkDir::new(&config.work_dir);
    assert!(approx(fake.written_audio_secs(&work.audio(0)).unwrap(), 12.0));
}

#[tokio::test]
async fn illegal_log_aborts_before_any_media_work() {
    let scratch = scratch_dir("illegal");
    let config = test_config(&scratch);
    let fake = Arc::new(FakeBackend::new(&scratch.join("lecture.mp4"), 10.0));

    let err = run_edit(fake.clone(), &config, log_request(&scratch, "talk_after_both.log"))
        .await
        .unwrap_err();
    assert!(matches!(err, EditorError::IllegalTransition { .. }), "{err}");
    assert!(fake.state.lock().unwrap().extracted.is_empty());
    assert!(fake.concat_lists().is_empty());
}

#[tokio::test]
async fn empty_talk_is_a_degenerate_segment() {
    let scratch = scratch_dir("empty_talk");
    let config = test_config(&scratch);
    let fake = Arc::new(FakeBackend::new(&scratch.join("lecture.mp4"), 5.0));

    let err = run_edit(fake.clone(), &config, log_request(&scratch, "empty_talk.log"))
        .await
        .unwrap_err();
    assert!(matches!(err, EditorError::DegenerateSegment { index: 0, .. }), "{err}");
    assert!(fake.concat_lists().is_empty());
    assert!(!scratch.join("edited.mp4").exists());
}

#[tokio::test]
async fn missing_boundary_frame_is_a_missing_dependency() {
    let scratch = scratch_dir("phantom_frame");
    let config = test_config(&scratch);
    let mut fake = FakeBackend::new(&scratch.join("lecture.mp4"), 15.0);
    fake.phantom_frames.insert("last_visual_frame0.jpg".to_string());
    let fake = Arc::new(fake);

    let err = run_edit(fake.clone(), &config, log_request(&scratch, "two_sections.log"))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            EditorError::MissingDependency {
                index: 1,
                dependency: 0,
                ..
            }
        ),
        "{err}"
    );
    assert!(fake.concat_lists().is_empty());
}

#[tokio::test]
async fn failed_producer_halts_the_run() {
    let scratch = scratch_dir("failed_frame");
    let config = test_config(&scratch);
    let mut fake = FakeBackend::new(&scratch.join("lecture.mp4"), 15.0);
    fake.failing_frames.insert("last_visual_frame0.jpg".to_string());
    let fake = Arc::new(fake);

    let err = run_edit(fake.clone(), &config, log_request(&scratch, "two_sections.log"))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            EditorError::Media { .. } | EditorError::MissingDependency { .. }
        ),
        "{err}"
    );
    assert!(fake.concat_lists().is_empty());
}

#[tokio::test]
async fn early_failure_stops_later_segments_from_starting() {
    let scratch = scratch_dir("early_failure");
    let config = test_config(&scratch);
    let mut fake = FakeBackend::new(&scratch.join("lecture.mp4"), 32.0);
    fake.failing_frames.insert("last_visual_frame0.jpg".to_string());
    let fake = Arc::new(fake);

    let mut req = log_request(&scratch, "eight_sections.log");
    req.max_workers = Some(1);
    let err = run_edit(fake.clone(), &config, req).await.unwrap_err();
    assert!(
        matches!(
            err,
            EditorError::Media { .. } | EditorError::MissingDependency { .. }
        ),
        "{err}"
    );

    // With one worker, segment 1 may start while segment 0 is failing;
    // nothing after segment 2 should.
    let saved: Vec<String> = fake
        .state
        .lock()
        .unwrap()
        .saved_frames
        .iter()
        .map(|(path, _)| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert!(saved.len() <= 2, "frames saved: {saved:?}");
    for index in 3..8 {
        let name = format!("last_visual_frame{index}.jpg");
        assert!(!saved.contains(&name), "segment {index} started: {saved:?}");
    }
    assert!(fake.concat_lists().is_empty());
}

#[tokio::test]
async fn identical_inputs_give_identical_work() {
    let scratch = scratch_dir("idempotent");
    let config = test_config(&scratch);

    let first = Arc::new(FakeBackend::new(&scratch.join("lecture.mp4"), 15.0));
    run_edit(first.clone(), &config, log_request(&scratch, "two_sections.log"))
        .await
        .unwrap();
    let second = Arc::new(FakeBackend::new(&scratch.join("lecture.mp4"), 15.0));
    run_edit(second.clone(), &config, log_request(&scratch, "two_sections.log"))
        .await
        .unwrap();

    let mut first_jobs = first.jobs();
    let mut second_jobs = second.jobs();
    first_jobs.sort_by_key(|job| job.dest().to_path_buf());
    second_jobs.sort_by_key(|job| job.dest().to_path_buf());
    assert_eq!(first_jobs, second_jobs);
    assert_eq!(
        first.state.lock().unwrap().written_audio,
        second.state.lock().unwrap().written_audio
    );
}

#[tokio::test]
async fn cleanup_removes_the_work_dir() {
    let scratch = scratch_dir("cleanup");
    let config = test_config(&scratch);
    let fake = Arc::new(FakeBackend::new(&scratch.join("lecture.mp4"), 10.0));

    let mut req = log_request(&scratch, "single_section.log");
    req.cleanup = true;
    run_edit(fake, &config, req).await.unwrap();
    assert!(!config.work_dir.exists());
    assert!(scratch.join("edited.mp4").exists());
}

fn lecture_with_pauses(format: AudioFormat) -> AudioBuffer {
    let mut audio = AudioBuffer::silent(1000.0, format);
    audio.append(&tone(4.0, 0.25, format)).unwrap();
    audio.append(&AudioBuffer::silent(1000.0, format)).unwrap();
    audio.append(&tone(4.0, 0.25, format)).unwrap();
    audio
}

#[test]
fn silences_segment_the_recording() {
    let scratch = scratch_dir("silence_plan");
    let mut config = test_config(&scratch);
    config.editor.min_silence_ms = 500;
    let mut fake = FakeBackend::new(&scratch.join("lecture.mp4"), 10.0);
    fake.source_audio = Some(lecture_with_pauses(AudioFormat::new(8000, 1)));

    let (info, timeline) = build_plan(
        &fake,
        &config,
        &scratch.join("lecture.mp4"),
        &SegmentationSource::Silence,
    )
    .unwrap();

    assert!(approx(info.duration_secs, 10.0));
    assert_eq!(
        fake.state.lock().unwrap().audio_reads,
        vec![("temp_audio.wav".to_string(), SILENCE_DETECTION_FORMAT)]
    );
    assert_eq!(
        timeline.segments,
        vec![
            Segment::edit(Interval::new(0.0, 1.0), Interval::new(1.0, 5.0)),
            Segment::edit(Interval::new(5.0, 6.0), Interval::new(6.0, 10.0)),
        ]
    );
}

#[tokio::test]
async fn silence_mode_runs_end_to_end() {
    let scratch = scratch_dir("silence_edit");
    let mut config = test_config(&scratch);
    config.editor.min_silence_ms = 500;
    let mut fake = FakeBackend::new(&scratch.join("lecture.mp4"), 10.0);
    fake.source_audio = Some(lecture_with_pauses(AudioFormat::new(8000, 1)));
    let fake = Arc::new(fake);

    let report = run_edit(
        fake.clone(),
        &config,
        request(&scratch, SegmentationSource::Silence),
    )
    .await
    .unwrap();
    assert_eq!(report.segments.len(), 2);
    assert_eq!(fake.concat_lists()[0].lines().count(), 3);
}

#[test]
fn missing_source_is_reported_with_its_path() {
    let scratch = scratch_dir("missing_source");
    let config = test_config(&scratch);
    let fake = FakeBackend::new(&scratch.join("lecture.mp4"), 10.0);
    let missing = scratch.join("nope.mp4");

    let err = build_plan(
        &fake,
        &config,
        &missing,
        &SegmentationSource::EventLog(fixture_log("single_section.log")),
    )
    .unwrap_err();
    assert!(matches!(err, EditorError::MissingSourceFile { ref path } if *path == missing));
}
