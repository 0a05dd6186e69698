//! FFprobe utilities for reading the authoritative duration of a cached
//! artifact.

use std::path::Path;

use serde::Deserialize;

/// Error type for FFprobe operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffprobe binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffprobe execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("video file not found: {0}")]
    VideoNotFound(String),
}

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
    pub format: FfprobeFormat,
}

/// A single stream from ffprobe output.
#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    pub index: i32,
    pub codec_type: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration: Option<String>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
    pub format_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run `ffprobe` on a video file and return the parsed JSON output.
pub async fn probe_video(path: &Path) -> Result<FfprobeOutput, FfmpegError> {
    if !path.exists() {
        return Err(FfmpegError::VideoNotFound(
            path.to_string_lossy().to_string(),
        ));
    }

    let output = tokio::process::Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str::<FfprobeOutput>(&stdout)
        .map_err(|e| FfmpegError::ParseError(format!("{e}: {stdout}")))
}

/// Probe a video file and return its duration in seconds.
///
/// Fails if ffprobe reports no usable duration.
pub async fn probe_duration_secs(path: &Path) -> Result<f64, FfmpegError> {
    let probe = probe_video(path).await?;
    parse_duration(&probe).ok_or_else(|| {
        FfmpegError::ParseError(format!("no duration reported for {}", path.display()))
    })
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Find the first video stream in the ffprobe output.
fn first_video_stream(probe: &FfprobeOutput) -> Option<&FfprobeStream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
}

/// Parse the video duration in seconds from ffprobe output.
///
/// Prefers the container duration and falls back to the first video
/// stream's duration.
pub fn parse_duration(probe: &FfprobeOutput) -> Option<f64> {
    let from_format = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok());

    from_format
        .or_else(|| {
            first_video_stream(probe)
                .and_then(|s| s.duration.as_deref())
                .and_then(|d| d.parse::<f64>().ok())
        })
        .filter(|secs| secs.is_finite() && *secs > 0.0)
}

/// Find the first video stream's resolution.
pub fn parse_resolution(probe: &FfprobeOutput) -> Option<(i32, i32)> {
    first_video_stream(probe).and_then(|s| Some((s.width?, s.height?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_stream(duration: Option<&str>) -> FfprobeStream {
        FfprobeStream {
            index: 0,
            codec_type: Some("video".into()),
            width: Some(1280),
            height: Some(720),
            duration: duration.map(Into::into),
        }
    }

    #[test]
    fn test_parse_duration_from_format() {
        let probe = FfprobeOutput {
            streams: vec![video_stream(Some("4.0"))],
            format: FfprobeFormat {
                duration: Some("8.52".to_string()),
                format_name: None,
            },
        };
        assert!((parse_duration(&probe).unwrap() - 8.52).abs() < 0.001);
    }

    #[test]
    fn test_parse_duration_from_stream() {
        let probe = FfprobeOutput {
            streams: vec![video_stream(Some("5.04"))],
            format: FfprobeFormat {
                duration: None,
                format_name: None,
            },
        };
        assert!((parse_duration(&probe).unwrap() - 5.04).abs() < 0.001);
    }

    #[test]
    fn test_parse_duration_missing() {
        let probe = FfprobeOutput {
            streams: vec![video_stream(None)],
            format: FfprobeFormat {
                duration: Some("N/A".into()),
                format_name: None,
            },
        };
        assert!(parse_duration(&probe).is_none());
    }

    #[test]
    fn test_parse_resolution() {
        let probe = FfprobeOutput {
            streams: vec![video_stream(None)],
            format: FfprobeFormat {
                duration: None,
                format_name: None,
            },
        };
        assert_eq!(parse_resolution(&probe), Some((1280, 720)));
    }

    #[test]
    fn test_parse_probe_json() {
        let json = r#"{"streams":[{"index":0,"codec_type":"video","width":720,"height":1280}],
                       "format":{"duration":"5.000000","format_name":"mov,mp4"}}"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        assert_eq!(parse_duration(&probe), Some(5.0));
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = probe_duration_secs(Path::new("/nonexistent/clip.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, FfmpegError::VideoNotFound(_)));
    }
}
