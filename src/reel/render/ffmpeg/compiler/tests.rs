use std::path::{Path, PathBuf};

use super::{FfmpegCompiler, VideoDimensions};
use crate::reel::config::RenderSettings;
use crate::reel::render::ffmpeg::jobs::JobKind;
use crate::reel::render::timeline::Timeline;
use crate::reel::types::{MediaKind, Orientation};

fn compiler(orientation: Orientation) -> FfmpegCompiler {
    FfmpegCompiler::new(
        VideoDimensions::for_orientation(orientation),
        RenderSettings::default(),
    )
}

fn value_after<'a>(args: &'a [String], flag: &str) -> &'a str {
    let idx = args.iter().position(|arg| arg == flag).unwrap();
    &args[idx + 1]
}

#[test]
fn video_normalize_scales_crops_and_strips_audio() {
    let job = compiler(Orientation::Vertical).normalize(
        MediaKind::Video,
        Path::new("raw.mp4"),
        Path::new("norm.mp4"),
        Some(12.0),
    );

    assert_eq!(job.kind, JobKind::Normalize);
    assert_eq!(
        value_after(&job.args, "-vf"),
        "scale=1080:1920:force_original_aspect_ratio=increase,crop=1080:1920,setsar=1,fps=30"
    );
    assert!(job.args.iter().any(|arg| arg == "-an"));
    assert_eq!(job.args.last().unwrap(), "norm.mp4");
    assert_eq!(job.expected_duration, Some(12.0));
}

#[test]
fn image_normalize_writes_single_frame() {
    let job = compiler(Orientation::Horizontal).normalize(
        MediaKind::Image,
        Path::new("raw.jpg"),
        Path::new("norm.jpg"),
        Some(5.0),
    );

    assert_eq!(value_after(&job.args, "-frames:v"), "1");
    assert!(!value_after(&job.args, "-vf").contains("fps="));
    assert_eq!(job.expected_duration, None);
}

#[test]
fn trim_is_a_hard_cut() {
    let job = compiler(Orientation::Horizontal).trim(
        Path::new("joined.mp4"),
        Path::new("final.mp4"),
        20.0,
    );

    assert_eq!(value_after(&job.args, "-t"), "20.000000");
    assert!(!job.args.iter().any(|arg| arg.contains("setpts")));
    assert_eq!(job.output, PathBuf::from("final.mp4"));
}

#[test]
fn music_is_looped_before_being_cut_to_total() {
    let job = compiler(Orientation::Horizontal).fit_music(
        Path::new("music.mp3"),
        Path::new("music_fit.m4a"),
        80.0,
    );

    let loop_pos = job.args.iter().position(|a| a == "-stream_loop").unwrap();
    let input_pos = job.args.iter().position(|a| a == "-i").unwrap();
    assert!(loop_pos < input_pos);
    assert_eq!(value_after(&job.args, "-stream_loop"), "-1");
    assert_eq!(value_after(&job.args, "-t"), "80.000000");
}

#[test]
fn mux_mixes_narration_and_faded_music() {
    let mut timeline = Timeline::new("narration.mp3".into(), "music_fit.m4a".into(), 80.0);
    timeline.push(0, PathBuf::from("a.mp4"), 40.0);
    timeline.push(1, PathBuf::from("b.mp4"), 40.0);

    let job = compiler(Orientation::Horizontal).mux(
        &timeline,
        Path::new("list.txt"),
        Path::new("out.mp4"),
    );
    let graph = value_after(&job.args, "-filter_complex");

    assert!(graph.contains("[1:a]volume=1.500000[narration]"));
    assert!(graph.contains("[2:a]volume=-20.000000dB,afade=t=out:st=79.600000:d=0.400000[music]"));
    assert!(graph.contains("amix=inputs=2:duration=shortest"));
    assert!(graph.ends_with("[outa]"));

    assert_eq!(value_after(&job.args, "-f"), "concat");
    let maps: Vec<&String> = job
        .args
        .iter()
        .enumerate()
        .filter(|(i, _)| *i > 0 && job.args[i - 1] == "-map")
        .map(|(_, arg)| arg)
        .collect();
    assert_eq!(maps, vec!["0:v", "[outa]"]);
    assert!(job.args.iter().any(|arg| arg == "-shortest"));
    assert_eq!(job.expected_duration, Some(80.0));
    assert_eq!(job.args.last().unwrap(), "out.mp4");
}

#[test]
fn fade_never_starts_before_zero() {
    let timeline = Timeline::new("n.mp3".into(), "m.m4a".into(), 0.2);
    let job = compiler(Orientation::Horizontal).mux(
        &timeline,
        Path::new("list.txt"),
        Path::new("out.mp4"),
    );
    let graph = value_after(&job.args, "-filter_complex");
    assert!(graph.contains("afade=t=out:st=0.000000:d=0.200000"));
}
