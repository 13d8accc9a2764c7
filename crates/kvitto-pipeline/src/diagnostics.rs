//! Pipeline diagnostics: timing and per-stage metrics for each run.
//!
//! These diagnostics are permanent instrumentation intended for
//! detector tuning and fallback-rate monitoring. Every call to
//! [`rectify`](crate::rectify) collects diagnostics alongside the
//! pipeline result; callers decide whether to surface them (the CLI
//! prints them as JSON under `--debug`). Collection has no effect on
//! pipeline behavior or output bytes.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement
//! serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Which detection strategy produced the winning quadrilateral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionStrategy {
    /// Global threshold sweep.
    ThresholdSweep,
    /// Canny edge map with dilation.
    EdgeFallback,
}

/// What the detector tried and found during one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionMetrics {
    /// The strategy that won, or `None` when nothing was found.
    pub strategy: Option<DetectionStrategy>,
    /// The first productive threshold of the sweep, when the sweep won.
    pub winning_threshold: Option<u8>,
    /// How many ladder thresholds were binarized before stopping.
    pub thresholds_tried: usize,
    /// Total contours examined across both strategies.
    pub candidates_considered: usize,
}

/// Warp-stage metrics, present only when detection produced a quad
/// that cleared the area-ratio gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarpMetrics {
    /// Warped width in pixels.
    pub width: u32,
    /// Warped height in pixels.
    pub height: u32,
    /// Whether the warp cleared the legibility floor and was kept.
    pub accepted: bool,
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Input size in bytes.
    pub input_bytes: usize,
    /// Decoded source width in pixels.
    pub source_width: u32,
    /// Decoded source height in pixels.
    pub source_height: u32,
    /// Stage 0: image decoding.
    #[serde(with = "duration_serde")]
    pub decode_duration: Duration,
    /// Stage 1: boundary detection.
    #[serde(with = "duration_serde")]
    pub detect_duration: Duration,
    /// Detection outcome metrics.
    pub detection: DetectionMetrics,
    /// Stage 2: perspective warp (`None` when the pipeline fell back
    /// before warping).
    pub warp: Option<WarpMetrics>,
    /// Area ratio of the detected quad against the full image, when a
    /// quad was found.
    pub quad_area_ratio: Option<f64>,
    /// Stage 3: legibility cleanup.
    #[serde(with = "duration_serde")]
    pub clean_duration: Duration,
    /// Total wall-clock duration of the run.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_serde_round_trip() {
        let diag = RunDiagnostics {
            input_bytes: 1024,
            source_width: 640,
            source_height: 480,
            decode_duration: Duration::from_millis(3),
            detect_duration: Duration::from_millis(15),
            detection: DetectionMetrics {
                strategy: Some(DetectionStrategy::ThresholdSweep),
                winning_threshold: Some(150),
                thresholds_tried: 1,
                candidates_considered: 7,
            },
            warp: Some(WarpMetrics {
                width: 300,
                height: 900,
                accepted: true,
            }),
            quad_area_ratio: Some(0.42),
            clean_duration: Duration::from_millis(9),
            total_duration: Duration::from_millis(27),
        };
        let json = serde_json::to_string(&diag).unwrap();
        let deserialized: RunDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(diag, deserialized);
    }

    #[test]
    fn durations_serialize_as_seconds() {
        let diag = RunDiagnostics {
            input_bytes: 0,
            source_width: 1,
            source_height: 1,
            decode_duration: Duration::from_millis(500),
            detect_duration: Duration::ZERO,
            detection: DetectionMetrics {
                strategy: None,
                winning_threshold: None,
                thresholds_tried: 5,
                candidates_considered: 0,
            },
            warp: None,
            quad_area_ratio: None,
            clean_duration: Duration::ZERO,
            total_duration: Duration::from_millis(500),
        };
        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&diag).unwrap()).unwrap();
        assert!((value["decode_duration"].as_f64().unwrap() - 0.5).abs() < 1e-12);
    }
}
