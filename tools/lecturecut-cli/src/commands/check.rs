//! Check for the external media tools.

use lecturecut_common::config::AppConfig;
use lecturecut_render_engine::ffmpeg::command_exists;
use lecturecut_render_engine::{FfmpegBackend, MediaBackend};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("lecturecut System Check");
    println!("{}", "=".repeat(50));

    for binary in ["ffmpeg", "ffprobe"] {
        if command_exists(binary) {
            println!("[OK] {binary} found");
        } else {
            println!("[MISSING] {binary} not found on PATH");
        }
    }

    let backend = FfmpegBackend::new(config.output.clone());
    let settings = backend.settings();
    println!();
    println!("Encoder:");
    println!(
        "  Video: {} (preset {}, crf {})",
        settings.video_codec, settings.preset, settings.crf
    );
    println!(
        "  Audio: {} kbps, {} Hz, {} channel(s)",
        settings.audio_bitrate_kbps, settings.audio_sample_rate, settings.audio_channels
    );
    println!("  Working directory: {}", config.work_dir.display());

    println!();
    if backend.is_available() {
        println!("All required tools are available. lecturecut is ready.");
    } else {
        println!("Install ffmpeg (which ships ffprobe) and make sure it is on PATH.");
    }

    Ok(())
}
