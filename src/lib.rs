//! # Sprite Forge
//!
//! Turns a single character prompt into a multi-animation game sprite asset set: one
//! generated sheet per animation, sliced into frames, background removed, normalized onto a
//! fixed canvas, and re-assembled into sprite sheets, GIF previews, a combined sheet and
//! Phaser/Unity metadata.
//!
//! ## Architecture
//!
//! - `generator`: sources of raw, unsliced sheets (HTTP API or offline mock)
//! - `processing`: pure pixel transforms (background removal, normalization, assembly)
//!   and metadata emission
//! - `job`: job records, the injected store, artifact paths and the runner
//! - `config`: runtime configuration and style presets
//!
//! Grid inference and SIMD scaling live in the `sprite_slice` crate.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sprite_forge::generator::MockGenerator;
//! use sprite_forge::job::{ArtifactLayout, JobRequest, JobRunner};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runner = JobRunner::builder()
//!     .with_generator(Arc::new(MockGenerator::new()))
//!     .with_layout(ArtifactLayout::new("outputs"))
//!     .build()?;
//!
//! let report = runner.generate(JobRequest::new("a knight in blue armor", "chibi")).await?;
//! println!("combined sheet at {}", report.combined_sheet);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod job;
pub mod logging;
pub mod processing;

pub use error::{
    ErrorContext, ErrorSeverity, HasRecoverySuggestion, HasSeverity, SpriteError, SpriteResult,
};
pub use job::{JobId, JobReport, JobRequest, JobRunner, JobStatus};
pub use logging::init_logging;
