//! # Sheet Generators
//!
//! The pipeline gets one raw sprite sheet per animation from a generator. Two
//! implementations exist:
//! - [`BriaClient`]: the hosted text-to-image API, reached over HTTP
//! - [`MockGenerator`]: an offline, deterministic sheet painter used when no API key is
//!   configured and in tests
//!
//! Generator failures are fatal for the job that requested the sheet; nothing here
//! retries.

pub mod bria;
pub mod mock;
pub mod prompt;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::GeneratorConfig;
use crate::error::SpriteResult;

pub use bria::BriaClient;
pub use mock::MockGenerator;

/// Everything a generator needs to paint one animation's sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRequest {
    /// Character description from the user.
    pub prompt: String,
    pub animation: String,
    pub frame_count: u32,
    /// Preset style label (e.g. "anime", "pixel art").
    pub style: String,
    /// Preset frame canvas; only offline generators use it.
    pub canvas: (u32, u32),
    pub seed: u64,
    /// Extra instructions for regenerating a sheet the user was unhappy with.
    pub refinement: Option<String>,
}

/// Source of raw, unsliced sprite sheets.
#[async_trait]
pub trait SheetGenerator: Send + Sync {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &str;

    /// Produce the encoded image bytes (PNG, JPEG, ...) of one sheet.
    async fn generate_sheet(&self, request: &SheetRequest) -> SpriteResult<Vec<u8>>;
}

/// Pick the HTTP client when an API key is configured, the mock otherwise.
pub fn select_generator(config: &GeneratorConfig) -> SpriteResult<Arc<dyn SheetGenerator>> {
    match config.api_key() {
        Some(_) => Ok(Arc::new(BriaClient::new(config)?)),
        None => {
            tracing::warn!("no generation API key configured, using the offline mock generator");
            Ok(Arc::new(MockGenerator::new()))
        }
    }
}
