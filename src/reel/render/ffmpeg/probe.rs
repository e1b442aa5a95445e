use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Facts about a media file as reported by ffprobe
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MediaProbe {
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl MediaProbe {
    /// Duration in seconds, or an error when the file has none
    pub fn require_duration(&self, path: &Path) -> Result<f64> {
        match self.duration {
            Some(duration) if duration > 0.0 => Ok(duration),
            _ => bail!("{} has no measurable duration", path.display()),
        }
    }
}

pub fn probe_args(path: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration:stream=codec_type,width,height,duration".to_string(),
        "-of".to_string(),
        "json".to_string(),
        path.to_string_lossy().into_owned(),
    ]
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    duration: Option<String>,
}

fn parse_seconds(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Parse ffprobe's JSON output.
///
/// The container duration wins; the first stream duration is the fallback.
/// Dimensions come from the first video stream.
pub fn parse_probe_json(json: &str) -> Result<MediaProbe> {
    let output: ProbeOutput =
        serde_json::from_str(json).context("Failed to parse ffprobe output")?;

    let video = output
        .streams
        .iter()
        .find(|stream| stream.codec_type.as_deref() == Some("video"));

    let duration = output
        .format
        .as_ref()
        .and_then(|format| parse_seconds(format.duration.as_deref()))
        .or_else(|| {
            output
                .streams
                .iter()
                .find_map(|stream| parse_seconds(stream.duration.as_deref()))
        });

    Ok(MediaProbe {
        duration,
        width: video.and_then(|v| v.width),
        height: video.and_then(|v| v.height),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_format_duration_and_video_size() {
        let json = r#"{
            "streams": [
                {"codec_type": "audio", "duration": "9.98"},
                {"codec_type": "video", "width": 1920, "height": 1080, "duration": "10.00"}
            ],
            "format": {"duration": "10.033000"}
        }"#;
        let probe = parse_probe_json(json).unwrap();
        assert_eq!(probe.duration, Some(10.033));
        assert_eq!(probe.width, Some(1920));
        assert_eq!(probe.height, Some(1080));
    }

    #[test]
    fn falls_back_to_stream_duration() {
        let json = r#"{"streams": [{"codec_type": "audio", "duration": "42.5"}], "format": {"duration": "N/A"}}"#;
        let probe = parse_probe_json(json).unwrap();
        assert_eq!(probe.duration, Some(42.5));
        assert_eq!(probe.width, None);
    }

    #[test]
    fn still_image_has_no_duration() {
        let json = r#"{"streams": [{"codec_type": "video", "width": 800, "height": 1200}], "format": {}}"#;
        let probe = parse_probe_json(json).unwrap();
        assert!(probe.require_duration(Path::new("still.jpg")).is_err());
        assert_eq!(probe.height, Some(1200));
    }
}
