use std::env;
use std::fmt;
use std::str::FromStr;

use blink_core::{BlinkConfig, EyeIndexMap, NoFacePolicy};
use thiserror::Error;

use crate::constants::{DEFAULT_MIN_DETECTION_CONFIDENCE, STDIN_SOURCE};
use crate::pipeline::PipelineSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub landmark_source: String,
    pub report_format: ReportFormat,
    /// 0 表示不限制
    pub max_frames: u64,
    pub detector: DetectorEnvConfig,
}

#[derive(Debug, Clone)]
pub struct DetectorEnvConfig {
    pub ear_threshold: f64,
    pub debounce_frames: u32,
    pub no_face_policy: NoFacePolicy,
    pub min_detection_confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Log,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "json" | "jsonl" => Ok(Self::Json),
            other => Err(format!("unknown report format '{other}'")),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Log => f.write_str("log"),
            ReportFormat::Json => f.write_str("json"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error(transparent)]
    Detector(#[from] blink_core::ConfigError),
    #[error("MIN_DETECTION_CONFIDENCE must be within [0, 1], got {0}")]
    InvalidConfidence(f64),
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            landmark_source: env_or("LANDMARK_SOURCE", STDIN_SOURCE),
            report_format: env_or_parse("REPORT_FORMAT", ReportFormat::Log),
            max_frames: env_or_parse("MAX_FRAMES", 0_u64),
            detector: DetectorEnvConfig {
                ear_threshold: env_or_parse("EAR_THRESHOLD", blink_core::blink::DEFAULT_EAR_THRESHOLD),
                debounce_frames: env_or_parse(
                    "DEBOUNCE_FRAMES",
                    blink_core::blink::DEFAULT_DEBOUNCE_FRAMES,
                ),
                no_face_policy: env_or_parse("NO_FACE_POLICY", NoFacePolicy::Reset),
                min_detection_confidence: env_or_parse(
                    "MIN_DETECTION_CONFIDENCE",
                    DEFAULT_MIN_DETECTION_CONFIDENCE,
                ),
            },
        }
    }

    pub fn blink_config(&self) -> Result<BlinkConfig, SettingsError> {
        Ok(BlinkConfig::new(
            self.detector.ear_threshold,
            self.detector.debounce_frames,
            self.detector.no_face_policy,
        )?)
    }

    pub fn pipeline_settings(&self) -> Result<PipelineSettings, SettingsError> {
        let confidence = self.detector.min_detection_confidence;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(SettingsError::InvalidConfidence(confidence));
        }
        Ok(PipelineSettings {
            blink: self.blink_config()?,
            eye_map: EyeIndexMap::default(),
            min_detection_confidence: confidence,
            max_frames: (self.max_frames > 0).then_some(self.max_frames),
        })
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
