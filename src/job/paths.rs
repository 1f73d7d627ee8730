//! Deterministic artifact locations.
//!
//! Every path is a function of (job id, animation, kind), so callers can predict download
//! locations without reading the job record.
//!
//! ```text
//! <root>/<job>/<anim>_raw.png
//! <root>/<job>/<anim>_sheet.png
//! <root>/<job>/<anim>.gif
//! <root>/<job>/<anim>/frame_NN.png
//! <root>/<job>/combined_sheet.png
//! <root>/<job>/metadata.json
//! ```

use std::path::{Path, PathBuf};

use super::JobId;

/// URL prefix the HTTP layer serves the output root under.
pub const DEFAULT_URL_PREFIX: &str = "/outputs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind<'a> {
    RawSheet(&'a str),
    Sheet(&'a str),
    Gif(&'a str),
    Frame(&'a str, usize),
    CombinedSheet,
    Metadata,
}

impl ArtifactKind<'_> {
    /// Path relative to the job directory, always `/`-separated.
    pub fn relative(&self) -> String {
        match self {
            Self::RawSheet(anim) => format!("{}_raw.png", anim),
            Self::Sheet(anim) => format!("{}_sheet.png", anim),
            Self::Gif(anim) => format!("{}.gif", anim),
            Self::Frame(anim, index) => format!("{}/frame_{:02}.png", anim, index),
            Self::CombinedSheet => "combined_sheet.png".to_string(),
            Self::Metadata => "metadata.json".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
    url_prefix: String,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
        }
    }

    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_dir(&self, job: &JobId) -> PathBuf {
        self.root.join(job.as_str())
    }

    /// Directory holding the individual frames of one animation.
    pub fn frame_dir(&self, job: &JobId, animation: &str) -> PathBuf {
        self.job_dir(job).join(animation)
    }

    pub fn path(&self, job: &JobId, kind: ArtifactKind<'_>) -> PathBuf {
        let mut path = self.job_dir(job);
        for part in kind.relative().split('/') {
            path.push(part);
        }
        path
    }

    pub fn url(&self, job: &JobId, kind: ArtifactKind<'_>) -> String {
        format!("{}/{}/{}", self.url_prefix, job, kind.relative())
    }
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self::new("outputs")
    }
}
