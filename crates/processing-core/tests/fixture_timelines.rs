use std::path::PathBuf;

use lecturecut_processing_core::interval_machine::build_timeline_from_log;
use lecturecut_processing_core::TransitionError;
use lecturecut_project_model::event::load_event_log;
use lecturecut_project_model::timeline::{Interval, Segment, Timeline};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("logs")
        .join(name)
}

fn timeline_for(name: &str, duration_secs: f64) -> Result<Timeline, TransitionError> {
    let log = load_event_log(&fixture(name)).expect("fixture log should parse");
    build_timeline_from_log(&log, duration_secs)
}

#[test]
fn two_sections_fixture_summary_is_stable() {
    let timeline = timeline_for("two_sections.log", 15.0).unwrap();
    assert_eq!(
        timeline.segments,
        vec![
            Segment::edit(Interval::new(0.0, 3.0), Interval::new(3.0, 8.0)),
            Segment::edit(Interval::new(8.0, 10.0), Interval::new(10.0, 15.0)),
        ]
    );
    assert!(timeline.covers(15.0));

    let summary = timeline.summary();
    let expected = [
        "Edit: Draw [   0.0,    3.0] -    3.0",
        "Edit: Talk [   3.0,    8.0] -    5.0",
        "Edit: Draw [   8.0,   10.0] -    2.0",
        "Edit: Talk [  10.0,   15.0] -    5.0",
    ];
    for line in expected {
        assert!(summary.contains(line), "missing {line:?} in\n{summary}");
    }
}

#[test]
fn mixed_fixture_skips_unknown_cues() {
    let log = load_event_log(&fixture("mixed.log")).unwrap();
    assert_eq!(log.unrecognized.len(), 1);
    assert_eq!(log.unrecognized[0].name, "Event Marker");

    let timeline = build_timeline_from_log(&log, 12.0).unwrap();
    assert_eq!(
        timeline.segments,
        vec![
            Segment::raw(Interval::new(0.0, 4.0)),
            Segment::edit(Interval::new(4.0, 7.0), Interval::new(7.0, 12.0)),
        ]
    );
}

#[test]
fn stop_before_the_end_leaves_a_gap() {
    let timeline = timeline_for("single_section.log", 10.0).unwrap();
    assert_eq!(timeline.gaps(10.0), vec![Interval::new(8.0, 10.0)]);
    assert!(!timeline.covers(10.0));
}

#[test]
fn empty_talk_survives_timeline_building() {
    let timeline = timeline_for("empty_talk.log", 5.0).unwrap();
    match timeline.segments.as_slice() {
        [Segment::Edit { talk, .. }] => assert!(talk.is_empty()),
        other => panic!("expected one edit segment, got {other:?}"),
    }
}

#[test]
fn talk_after_both_is_rejected() {
    let err = timeline_for("talk_after_both.log", 10.0).unwrap_err();
    assert_eq!(err, TransitionError::TalkAfterBothWithoutDraw { at_secs: 4.0 });
}
