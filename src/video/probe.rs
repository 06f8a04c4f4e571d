use std::path::Path;
use std::time::Duration;

use crate::core::error::BackendError;
use crate::video::runtime::MediaRuntime;

/// What a session needs to know about a file before decoding it
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub duration: Option<Duration>,
    pub frame_rate: f64,
    pub has_audio: bool,
}

const DEFAULT_FRAME_RATE: f64 = 30.0;

pub fn probe(runtime: &MediaRuntime, path: &Path) -> Result<MediaInfo, BackendError> {
    let load_error = |reason: String| BackendError::Load {
        path: path.to_path_buf(),
        reason,
    };

    let output = runtime
        .ffprobe_command()
        .arg("-v")
        .arg("quiet")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg("-show_streams")
        .arg(path)
        .output()
        .map_err(|e| load_error(format!("ffprobe failed to run: {}", e)))?;

    if !output.status.success() {
        return Err(load_error(format!("ffprobe exited with {}", output.status)));
    }

    let json = String::from_utf8_lossy(&output.stdout);
    parse_probe_output(&json).map_err(load_error)
}

/// Parse `ffprobe -print_format json -show_format -show_streams`
pub fn parse_probe_output(json: &str) -> Result<MediaInfo, String> {
    let info: serde_json::Value = serde_json::from_str(json).map_err(|e| format!("unreadable probe output: {}", e))?;

    let duration = info["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(Duration::from_secs_f64);

    let streams = info["streams"].as_array().map(Vec::as_slice).unwrap_or_default();
    let video = streams.iter().find(|s| s["codec_type"].as_str() == Some("video"));
    let has_audio = streams.iter().any(|s| s["codec_type"].as_str() == Some("audio"));

    let Some(video) = video else {
        return Err("no video stream".to_string());
    };

    let frame_rate = video["r_frame_rate"]
        .as_str()
        .and_then(parse_frame_rate)
        .unwrap_or(DEFAULT_FRAME_RATE);

    Ok(MediaInfo {
        duration,
        frame_rate,
        has_audio,
    })
}

/// "30000/1001" or "25"
fn parse_frame_rate(value: &str) -> Option<f64> {
    let fps = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.trim().parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then(|| fps.clamp(1.0, 240.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            { "index": 0, "codec_type": "video", "r_frame_rate": "30000/1001" },
            { "index": 1, "codec_type": "audio", "sample_rate": "48000" }
        ],
        "format": { "filename": "clip.mp4", "duration": "93.480000" }
    }"#;

    #[test]
    fn test_parse_video_with_audio() {
        let info = parse_probe_output(SAMPLE).unwrap();
        assert_eq!(info.duration, Some(Duration::from_secs_f64(93.48)));
        assert!(info.has_audio);
        assert!((info.frame_rate - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_silent_video_without_duration() {
        let json = r#"{ "streams": [ { "codec_type": "video", "r_frame_rate": "0/0" } ], "format": {} }"#;
        let info = parse_probe_output(json).unwrap();
        assert!(!info.has_audio);
        assert_eq!(info.duration, None);
        assert_eq!(info.frame_rate, DEFAULT_FRAME_RATE);
    }

    #[test]
    fn test_audio_only_file_is_rejected() {
        let json = r#"{ "streams": [ { "codec_type": "audio" } ], "format": { "duration": "10.0" } }"#;
        assert!(parse_probe_output(json).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_probe_output("not json").is_err());
    }

    #[test]
    fn test_frame_rate_formats() {
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("60/1"), Some(60.0));
        assert_eq!(parse_frame_rate("1/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }
}
