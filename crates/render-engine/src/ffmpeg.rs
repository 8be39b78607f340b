//! ffmpeg-backed [`MediaBackend`].
//!
//! Every method shells out to `ffmpeg`/`ffprobe`. Argument lists are built
//! by pure functions so they can be checked without the binaries.

use std::io::{BufReader, Read, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use anyhow::Context;
use lecturecut_audio::{AudioBuffer, AudioFormat};
use lecturecut_common::config::OutputSettings;
use lecturecut_common::error::{EditorError, EditorResult};
use lecturecut_processing_core::palette::{sample_times, PaletteProbe, RgbFrame};
use lecturecut_project_model::timeline::Interval;
use serde::Deserialize;

use crate::backend::{MediaBackend, MediaInfo, RenderJob};

/// Lines of ffmpeg stderr kept in error messages.
const STDERR_TAIL_LINES: usize = 12;

/// Media backend driving the system `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegBackend {
    settings: OutputSettings,
}

impl FfmpegBackend {
    pub fn new(settings: OutputSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &OutputSettings {
        &self.settings
    }

    /// Run ffmpeg to completion, draining stderr on a side thread.
    fn run_ffmpeg(&self, args: &[String]) -> EditorResult<()> {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to start ffmpeg")?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EditorError::media("Failed to capture ffmpeg stderr"))?;
        let stderr_task = std::thread::spawn(move || drain(stderr));

        let status = child.wait().context("Failed to wait on ffmpeg")?;
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());
        check_status("ffmpeg", status, &stderr_output)
    }

    /// Run ffmpeg and collect what it writes to stdout.
    fn run_ffmpeg_capture(&self, args: &[String]) -> EditorResult<Vec<u8>> {
        tracing::debug!(args = ?args, "Running ffmpeg (capture)");
        let output = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::null())
            .output()
            .context("Failed to start ffmpeg")?;
        check_status(
            "ffmpeg",
            output.status,
            &String::from_utf8_lossy(&output.stderr),
        )?;
        Ok(output.stdout)
    }

    /// Run ffmpeg, reading raw frames from stdout one at a time into `frame`.
    ///
    /// Only one frame is held in memory; a short read at the end of the
    /// stream is discarded.
    fn run_ffmpeg_frames(
        &self,
        args: &[String],
        frame: &mut RgbFrame,
        mut on_frame: impl FnMut(&RgbFrame),
    ) -> EditorResult<()> {
        tracing::debug!(args = ?args, frame_bytes = frame.data.len(), "Running ffmpeg (frames)");
        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to start ffmpeg")?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EditorError::media("Failed to capture ffmpeg stderr"))?;
        let stderr_task = std::thread::spawn(move || drain(stderr));

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| EditorError::media("Failed to capture ffmpeg stdout"))?;
        let read_result = read_frames(&mut stdout, frame, &mut on_frame);
        drop(stdout);

        let status = child.wait().context("Failed to wait on ffmpeg")?;
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());
        check_status("ffmpeg", status, &stderr_output)?;
        let frames = read_result.context("Failed to read frames from ffmpeg")?;
        tracing::debug!(frames, "Frames decoded");
        Ok(())
    }

    /// Run ffmpeg feeding `input` on stdin.
    fn run_ffmpeg_with_input(&self, args: &[String], input: &[u8]) -> EditorResult<()> {
        tracing::debug!(args = ?args, bytes = input.len(), "Running ffmpeg (stdin)");
        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to start ffmpeg")?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EditorError::media("Failed to capture ffmpeg stderr"))?;
        let stderr_task = std::thread::spawn(move || drain(stderr));

        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| EditorError::media("Failed to open ffmpeg stdin"))?;
            stdin
                .write_all(input)
                .context("Failed to stream samples to ffmpeg")?;
        }

        let status = child.wait().context("Failed to wait on ffmpeg")?;
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());
        check_status("ffmpeg", status, &stderr_output)
    }
}

impl MediaBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_available(&self) -> bool {
        command_exists("ffmpeg") && command_exists("ffprobe")
    }

    fn probe(&self, path: &Path) -> EditorResult<MediaInfo> {
        if !path.exists() {
            return Err(EditorError::missing_source(path));
        }
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,r_frame_rate:format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .context("Failed to start ffprobe")?;
        check_status(
            "ffprobe",
            output.status,
            &String::from_utf8_lossy(&output.stderr),
        )?;
        let info = parse_probe_output(&String::from_utf8_lossy(&output.stdout))?;
        tracing::debug!(path = %path.display(), ?info, "Probed media");
        Ok(info)
    }

    fn extract_clip(&self, source: &Path, span: Interval, dest: &Path) -> EditorResult<()> {
        if !source.exists() {
            return Err(EditorError::missing_source(source));
        }
        self.run_ffmpeg(&extract_clip_args(source, span, dest, &self.settings))
    }

    fn extract_audio(&self, video: &Path, format: AudioFormat, dest: &Path) -> EditorResult<()> {
        if !video.exists() {
            return Err(EditorError::missing_source(video));
        }
        self.run_ffmpeg(&extract_audio_args(video, format, dest))
    }

    fn read_audio(&self, path: &Path, format: AudioFormat) -> EditorResult<AudioBuffer> {
        if !path.exists() {
            return Err(EditorError::missing_source(path));
        }
        let bytes = self.run_ffmpeg_capture(&decode_audio_args(path, format))?;
        AudioBuffer::new(f32le_to_samples(&bytes), format)
    }

    fn write_audio(&self, buffer: &AudioBuffer, dest: &Path) -> EditorResult<()> {
        let bytes = samples_to_f32le(buffer.samples());
        self.run_ffmpeg_with_input(&encode_audio_args(buffer.format(), dest), &bytes)
    }

    fn save_frame(&self, video: &Path, at_secs: f64, dest: &Path) -> EditorResult<()> {
        if !video.exists() {
            return Err(EditorError::missing_source(video));
        }
        self.run_ffmpeg(&save_frame_args(video, at_secs, dest))
    }

    fn scan_palette(
        &self,
        video: &Path,
        span: Interval,
        interval_secs: f64,
        probe: &PaletteProbe,
    ) -> EditorResult<Vec<bool>> {
        let info = self.probe(video)?;
        if info.width == 0 || info.height == 0 {
            return Err(EditorError::media(format!(
                "{} has no picture size",
                video.display()
            )));
        }
        // The fps filter may emit a trailing frame at the end of the span.
        let expected = sample_times(interval_secs, span.duration()).len();
        let mut frame = RgbFrame::filled(info.width, info.height, [0, 0, 0]);
        let mut visible = Vec::with_capacity(expected);
        self.run_ffmpeg_frames(
            &sample_frames_args(video, span, interval_secs),
            &mut frame,
            |frame| visible.push(probe.is_visible(frame)),
        )?;
        visible.truncate(expected);
        Ok(visible)
    }

    fn render(&self, job: &RenderJob) -> EditorResult<()> {
        let started = std::time::Instant::now();
        self.run_ffmpeg(&render_args(job, &self.settings))?;
        tracing::debug!(
            kind = job.kind(),
            dest = %job.dest().display(),
            elapsed_ms = started.elapsed().as_millis(),
            "Render job finished"
        );
        Ok(())
    }

    fn concat(&self, list: &Path, dest: &Path) -> EditorResult<()> {
        if !list.exists() {
            return Err(EditorError::missing_source(list));
        }
        self.run_ffmpeg(&concat_args(list, dest))
    }
}

/// Fill `frame` from `reader` until the stream ends, calling `on_frame`
/// after each complete frame. Returns the number of complete frames.
fn read_frames<R: Read>(
    reader: &mut R,
    frame: &mut RgbFrame,
    on_frame: &mut impl FnMut(&RgbFrame),
) -> std::io::Result<usize> {
    let mut count = 0;
    loop {
        match reader.read_exact(&mut frame.data) {
            Ok(()) => {
                on_frame(&*frame);
                count += 1;
            }
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(count),
            Err(err) => return Err(err),
        }
    }
}

fn drain<R: Read>(stream: R) -> String {
    let mut reader = BufReader::new(stream);
    let mut output = String::new();
    match reader.read_to_string(&mut output) {
        Ok(_) => output,
        Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
    }
}

fn check_status(binary: &str, status: ExitStatus, stderr: &str) -> EditorResult<()> {
    if status.success() {
        return Ok(());
    }
    Err(EditorError::media(format!(
        "{binary} failed (status {status}): {}",
        stderr_tail(stderr)
    )))
}

/// Last non-empty stderr lines, where ffmpeg reports the actual failure.
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let skip = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[skip..].join("\n")
}

/// Check whether a binary is on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -of json` output into [`MediaInfo`].
pub fn parse_probe_output(json: &str) -> EditorResult<MediaInfo> {
    let probe: ProbeOutput = serde_json::from_str(json)?;
    let stream = probe
        .streams
        .first()
        .ok_or_else(|| EditorError::media("No video stream found"))?;

    let duration_secs = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| EditorError::media("Could not determine media duration"))?;

    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .ok_or_else(|| EditorError::media("Could not determine frame rate"))?;

    Ok(MediaInfo {
        duration_secs,
        fps,
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
    })
}

/// Parse an ffmpeg rational such as `30000/1001` or a plain number.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let fps = match raw.split_once('/') {
        Some((num, den)) => {
            let num = num.parse::<f64>().ok()?;
            let den = den.parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse::<f64>().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

fn f32le_to_samples(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn samples_to_f32le(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

fn secs(value: f64) -> String {
    format!("{:.6}", value.max(0.0))
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn base_args() -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ]
}

/// Encoder arguments shared by every rendered clip.
pub fn codec_args(settings: &OutputSettings) -> Vec<String> {
    vec![
        "-c:v".to_string(),
        settings.video_codec.clone(),
        "-preset".to_string(),
        settings.preset.clone(),
        "-crf".to_string(),
        settings.crf.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        format!("{}k", settings.audio_bitrate_kbps.max(64)),
        "-ar".to_string(),
        settings.audio_sample_rate.to_string(),
        "-ac".to_string(),
        settings.audio_channels.to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
    ]
}

/// Cut `span` out of `source`, re-encoded so the cut lands on the exact frame.
pub fn extract_clip_args(
    source: &Path,
    span: Interval,
    dest: &Path,
    settings: &OutputSettings,
) -> Vec<String> {
    let mut args = base_args();
    args.extend([
        "-ss".to_string(),
        secs(span.start),
        "-t".to_string(),
        secs(span.duration()),
        "-i".to_string(),
        path_arg(source),
    ]);
    args.extend(codec_args(settings));
    args.push(path_arg(dest));
    args
}

pub fn extract_audio_args(video: &Path, format: AudioFormat, dest: &Path) -> Vec<String> {
    let mut args = base_args();
    args.extend([
        "-i".to_string(),
        path_arg(video),
        "-vn".to_string(),
        "-ac".to_string(),
        format.channels.to_string(),
        "-ar".to_string(),
        format.sample_rate.to_string(),
        "-c:a".to_string(),
        "pcm_s16le".to_string(),
        path_arg(dest),
    ]);
    args
}

pub fn decode_audio_args(path: &Path, format: AudioFormat) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        path_arg(path),
        "-vn".to_string(),
        "-f".to_string(),
        "f32le".to_string(),
        "-ac".to_string(),
        format.channels.to_string(),
        "-ar".to_string(),
        format.sample_rate.to_string(),
        "pipe:1".to_string(),
    ]
}

pub fn encode_audio_args(format: AudioFormat, dest: &Path) -> Vec<String> {
    let mut args = base_args();
    args.extend([
        "-f".to_string(),
        "f32le".to_string(),
        "-ar".to_string(),
        format.sample_rate.to_string(),
        "-ac".to_string(),
        format.channels.to_string(),
        "-i".to_string(),
        "pipe:0".to_string(),
        "-c:a".to_string(),
        "pcm_s16le".to_string(),
        path_arg(dest),
    ]);
    args
}

pub fn save_frame_args(video: &Path, at_secs: f64, dest: &Path) -> Vec<String> {
    let mut args = base_args();
    args.extend([
        "-ss".to_string(),
        secs(at_secs),
        "-i".to_string(),
        path_arg(video),
        "-frames:v".to_string(),
        "1".to_string(),
        "-q:v".to_string(),
        "2".to_string(),
        path_arg(dest),
    ]);
    args
}

pub fn sample_frames_args(video: &Path, span: Interval, interval_secs: f64) -> Vec<String> {
    let rate = if interval_secs > 0.0 {
        1.0 / interval_secs
    } else {
        1.0
    };
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-ss".to_string(),
        secs(span.start),
        "-t".to_string(),
        secs(span.duration()),
        "-i".to_string(),
        path_arg(video),
        "-vf".to_string(),
        format!("fps={rate:.6}"),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "pipe:1".to_string(),
    ]
}

pub fn concat_args(list: &Path, dest: &Path) -> Vec<String> {
    let mut args = base_args();
    args.extend([
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        path_arg(list),
        "-c".to_string(),
        "copy".to_string(),
        path_arg(dest),
    ]);
    args
}

/// Video filter chain that retimes the drawing interval.
///
/// ```text
/// trim(draw) -> drop palette cut-outs -> hold last frame -> speed -> fps
/// ```
pub fn retime_filter(
    draw: Interval,
    cutouts: &[Interval],
    extension_secs: f64,
    speed_ratio: f64,
    fps: f64,
) -> String {
    let mut chain = vec![
        format!("trim=start={}:end={}", secs(draw.start), secs(draw.end)),
        "setpts=PTS-STARTPTS".to_string(),
    ];
    if !cutouts.is_empty() {
        let removed = cutouts
            .iter()
            .map(|c| format!("between(t\\,{}\\,{})", secs(c.start), secs(c.end)))
            .collect::<Vec<_>>()
            .join("+");
        chain.push(format!("select=not({removed})"));
        chain.push("setpts=N/FRAME_RATE/TB".to_string());
    }
    if extension_secs > 0.0 {
        chain.push(format!(
            "tpad=stop_mode=clone:stop_duration={}",
            secs(extension_secs)
        ));
    }
    chain.push(format!("setpts=PTS/{speed_ratio:.6}"));
    chain.push(format!("fps={fps:.6}"));
    format!("[0:v]{}[v]", chain.join(","))
}

/// Filter graph fading `video` in over a still `image`.
pub fn crossfade_filter(duration_secs: f64, fps: f64) -> String {
    let d = secs(duration_secs);
    format!(
        "[1:v]trim=duration={d},setpts=PTS-STARTPTS,format=yuva420p,\
         fade=t=in:st=0:d={d}:alpha=1[fg];\
         [0:v][fg]overlay=shortest=1,fps={fps:.6},format=yuv420p[v]"
    )
}

/// Full ffmpeg argument list for a render job.
pub fn render_args(job: &RenderJob, settings: &OutputSettings) -> Vec<String> {
    let mut args = base_args();
    match job {
        RenderJob::Retime {
            video,
            audio,
            draw,
            cutouts,
            extension_secs,
            speed_ratio,
            output_secs,
            fps,
            dest,
        } => {
            args.extend([
                "-i".to_string(),
                path_arg(video),
                "-i".to_string(),
                path_arg(audio),
                "-filter_complex".to_string(),
                retime_filter(*draw, cutouts, *extension_secs, *speed_ratio, *fps),
                "-map".to_string(),
                "[v]".to_string(),
                "-map".to_string(),
                "1:a:0".to_string(),
                "-t".to_string(),
                secs(*output_secs),
            ]);
            args.extend(codec_args(settings));
            args.push(path_arg(dest));
        }
        RenderJob::Remux {
            video,
            audio,
            output_secs,
            fps,
            dest,
        } => {
            args.extend([
                "-i".to_string(),
                path_arg(video),
                "-i".to_string(),
                path_arg(audio),
                "-map".to_string(),
                "0:v:0".to_string(),
                "-map".to_string(),
                "1:a:0".to_string(),
                "-vf".to_string(),
                format!("fps={fps:.6}"),
                "-t".to_string(),
                secs(*output_secs),
            ]);
            args.extend(codec_args(settings));
            args.push(path_arg(dest));
        }
        RenderJob::Crossfade {
            image,
            video,
            duration_secs,
            fps,
            dest,
        } => {
            args.extend([
                "-loop".to_string(),
                "1".to_string(),
                "-framerate".to_string(),
                format!("{fps:.6}"),
                "-t".to_string(),
                secs(*duration_secs),
                "-i".to_string(),
                path_arg(image),
                "-i".to_string(),
                path_arg(video),
                "-filter_complex".to_string(),
                crossfade_filter(*duration_secs, *fps),
                "-map".to_string(),
                "[v]".to_string(),
                "-map".to_string(),
                "1:a:0".to_string(),
                "-t".to_string(),
                secs(*duration_secs),
            ]);
            args.extend(codec_args(settings));
            args.push(path_arg(dest));
        }
        RenderJob::TrimHead {
            video,
            offset_secs,
            dest,
        } => {
            args.extend([
                "-i".to_string(),
                path_arg(video),
                "-ss".to_string(),
                secs(*offset_secs),
                "-map".to_string(),
                "0:v:0".to_string(),
                "-map".to_string(),
                "0:a:0".to_string(),
            ]);
            args.extend(codec_args(settings));
            args.push(path_arg(dest));
        }
    }
    args
}
