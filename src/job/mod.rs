//! # Jobs
//!
//! A job turns one prompt plus a resolved preset into a complete sprite asset set.
//!
//! - [`JobRequest`]: what the caller asked for
//! - [`JobRecord`]: what the [`JobStore`] keeps while the job runs
//! - [`JobRunner`]: drives the per-animation state machine
//! - [`ArtifactLayout`]: where every artifact of a job lands on disk

pub mod paths;
pub mod runner;
pub mod store;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{AnimationSet, MAX_FRAME_COUNT, Preset, is_safe_name};
use crate::error::{SpriteError, SpriteResult};
use crate::processing::metadata::ordered_map;

pub use paths::{ArtifactKind, ArtifactLayout};
pub use runner::{JobRunner, JobRunnerBuilder};
pub use store::{InMemoryJobStore, JobStore};

/// 32 lowercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    pub fn new() -> Self {
        let bytes: [u8; 16] = rand::random();
        Self(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for JobId {
    type Err = SpriteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 32 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            Ok(Self(s.to_string()))
        } else {
            Err(SpriteError::validation("job_id", "32 lowercase hex digits", s))
        }
    }
}

impl TryFrom<String> for JobId {
    type Error = SpriteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

/// Lifecycle of a job. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Generating { animation: String },
    Slicing { animation: String },
    Assembling { animation: String },
    Combining,
    EmittingMetadata,
    Completed,
    Failed { reason: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Generating { animation } => write!(f, "generating({})", animation),
            Self::Slicing { animation } => write!(f, "slicing({})", animation),
            Self::Assembling { animation } => write!(f, "assembling({})", animation),
            Self::Combining => write!(f, "combining"),
            Self::EmittingMetadata => write!(f, "emitting_metadata"),
            Self::Completed => write!(f, "completed"),
            Self::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// One requested animation. Without a frame count the preset's count is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationRequest {
    pub name: String,
    #[serde(default)]
    pub frame_count: Option<u32>,
}

impl AnimationRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frame_count: None,
        }
    }

    pub fn with_frames(name: impl Into<String>, frame_count: u32) -> Self {
        Self {
            name: name.into(),
            frame_count: Some(frame_count),
        }
    }

    /// Parse `idle,run=6,attack`.
    pub fn parse_list(list: &str) -> SpriteResult<Vec<Self>> {
        list.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| match item.split_once('=') {
                Some((name, count)) => {
                    let count = count.trim().parse::<u32>().map_err(|_| {
                        SpriteError::validation("animations", "frame count must be an integer", item)
                    })?;
                    Ok(Self::with_frames(name.trim(), count))
                }
                None => Ok(Self::new(item)),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub prompt: String,
    pub preset: String,
    /// Requested animations in order; `None` means every animation of the preset.
    #[serde(default)]
    pub animations: Option<Vec<AnimationRequest>>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub refinement: Option<String>,
}

impl JobRequest {
    pub fn new(prompt: impl Into<String>, preset: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            preset: preset.into(),
            animations: None,
            seed: None,
            refinement: None,
        }
    }

    pub fn with_animations(mut self, animations: Vec<AnimationRequest>) -> Self {
        self.animations = Some(animations);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Extra instructions carried into every sheet prompt of the job.
    pub fn with_refinement(mut self, refinement: impl Into<String>) -> Self {
        self.refinement = Some(refinement.into());
        self
    }

    /// Ordered animation plan for this request against `preset`.
    ///
    /// Names the preset does not know and that carry no explicit frame count are skipped.
    pub fn resolve(&self, preset: &Preset) -> SpriteResult<AnimationSet> {
        if self.prompt.trim().is_empty() {
            return Err(SpriteError::validation("prompt", "must not be empty", ""));
        }

        let Some(requested) = &self.animations else {
            return Ok(preset.animations.clone());
        };

        let mut plan = AnimationSet::new();
        for anim in requested {
            if !is_safe_name(&anim.name) {
                return Err(SpriteError::validation(
                    "animations",
                    "names may only contain letters, digits, '_' and '-'",
                    anim.name.as_str(),
                ));
            }
            match anim.frame_count.or_else(|| preset.animations.get(&anim.name)) {
                Some(0) => {
                    return Err(SpriteError::validation(
                        "frame_count",
                        "must be at least 1",
                        anim.name.as_str(),
                    ));
                }
                Some(count) if count > MAX_FRAME_COUNT => {
                    return Err(SpriteError::validation(
                        "frame_count",
                        format!("at most {}", MAX_FRAME_COUNT),
                        format!("{}={}", anim.name, count),
                    ));
                }
                Some(count) => plan.insert(anim.name.as_str(), count),
                None => {
                    tracing::warn!(
                        animation = %anim.name,
                        preset = %preset.name,
                        "unknown animation skipped"
                    );
                }
            }
        }

        if plan.is_empty() {
            return Err(SpriteError::validation(
                "animations",
                "at least one known animation",
                requested
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            )
            .with_recovery_suggestion(format!(
                "Preset '{}' offers: {}",
                preset.name,
                preset.animations.names().collect::<Vec<_>>().join(", ")
            )));
        }
        Ok(plan)
    }
}

/// Stored state of one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub prompt: String,
    pub preset: Preset,
    /// Resolved animations in request order.
    pub animations: AnimationSet,
    pub seed: u64,
    pub refinement: Option<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub report: Option<JobReport>,
}

impl JobRecord {
    pub fn new(
        id: JobId,
        prompt: impl Into<String>,
        preset: Preset,
        animations: AnimationSet,
        seed: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            prompt: prompt.into(),
            preset,
            animations,
            seed,
            refinement: None,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            report: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationReport {
    pub sprite_sheet: String,
    pub gif: String,
    pub frame_count: u32,
    pub frames: Vec<String>,
}

/// Summary returned to the caller of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobReport {
    pub job_id: String,
    pub status: String,
    pub prompt: String,
    pub preset: String,
    pub frame_size: (u32, u32),
    #[serde(serialize_with = "ordered_map")]
    pub animations: Vec<(String, AnimationReport)>,
    pub combined_sheet: String,
    pub metadata: String,
    #[serde(serialize_with = "ordered_map")]
    pub download_urls: Vec<(String, String)>,
}

impl JobReport {
    pub fn animation(&self, name: &str) -> Option<&AnimationReport> {
        self.animations.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    pub fn download_url(&self, key: &str) -> Option<&str> {
        self.download_urls
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PresetStore;

    fn anime() -> Preset {
        PresetStore::default().load("anime_action")
    }

    #[test]
    fn test_job_id_is_hex() {
        let id = JobId::new();
        assert_eq!(id.as_str().len(), 32);
        assert_eq!(id.as_str().parse::<JobId>().unwrap(), id);
        assert_ne!(JobId::new(), id);
        assert!("../etc".parse::<JobId>().is_err());
    }

    #[test]
    fn test_parse_animation_list() {
        let list = AnimationRequest::parse_list("idle, run=6,,attack").unwrap();
        assert_eq!(
            list,
            vec![
                AnimationRequest::new("idle"),
                AnimationRequest::with_frames("run", 6),
                AnimationRequest::new("attack"),
            ]
        );
        assert!(AnimationRequest::parse_list("run=six").is_err());
    }

    #[test]
    fn test_resolve_defaults_to_preset() {
        let plan = JobRequest::new("a knight", "anime_action").resolve(&anime()).unwrap();
        assert_eq!(plan, anime().animations);
    }

    #[test]
    fn test_resolve_keeps_request_order_and_counts() {
        let request = JobRequest::new("a knight", "anime_action").with_animations(vec![
            AnimationRequest::new("run"),
            AnimationRequest::new("moonwalk"),
            AnimationRequest::with_frames("idle", 2),
            AnimationRequest::with_frames("dance", 5),
        ]);
        let plan = request.resolve(&anime()).unwrap();
        let entries: Vec<_> = plan.iter().collect();
        assert_eq!(entries, [("run", 6), ("idle", 2), ("dance", 5)]);
    }

    #[test]
    fn test_resolve_rejects_bad_requests() {
        let preset = anime();
        let unknown = JobRequest::new("x", "anime_action")
            .with_animations(vec![AnimationRequest::new("moonwalk")]);
        assert_eq!(unknown.resolve(&preset).unwrap_err().category(), "validation");

        let traversal = JobRequest::new("x", "anime_action")
            .with_animations(vec![AnimationRequest::with_frames("../up", 2)]);
        assert!(traversal.resolve(&preset).is_err());

        let zero = JobRequest::new("x", "anime_action")
            .with_animations(vec![AnimationRequest::with_frames("idle", 0)]);
        assert!(zero.resolve(&preset).is_err());

        assert!(JobRequest::new("  ", "anime_action").resolve(&preset).is_err());
    }

    #[test]
    fn test_resolve_caps_frame_count() {
        let preset = anime();
        let list = AnimationRequest::parse_list("run=4000000000").unwrap();
        let err = JobRequest::new("x", "anime_action")
            .with_animations(list)
            .resolve(&preset)
            .unwrap_err();
        assert_eq!(err.category(), "validation");

        let at_limit = JobRequest::new("x", "anime_action")
            .with_animations(vec![AnimationRequest::with_frames("run", MAX_FRAME_COUNT)]);
        assert_eq!(at_limit.resolve(&preset).unwrap().get("run"), Some(MAX_FRAME_COUNT));
    }

    #[test]
    fn test_status_display_and_terminal() {
        let status = JobStatus::Generating {
            animation: "run".into(),
        };
        assert_eq!(status.to_string(), "generating(run)");
        assert!(!status.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed { reason: "x".into() }.is_terminal());

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "generating");
        assert_eq!(json["animation"], "run");
    }
}
