//! # Processing Module
//!
//! Pure pixel transforms of the sprite pipeline. Nothing in here touches the filesystem;
//! the job runner persists results between stages.

pub mod assemble;
pub mod background;
pub mod metadata;
pub mod normalize;
pub mod slice;

pub use assemble::{make_combined_sheet, make_gif, make_sheet};
pub use background::{
    BackgroundRemover, BackgroundStrategy, ChromaKeyStrategy, EdgeFloodStrategy, HttpMatting,
    MattingStrategy,
};
pub use metadata::{AnimationArtifacts, SpriteMetadata, build_metadata};
pub use normalize::{FrameNormalizer, fit_to_canvas};
pub use slice::{SlicedAnimation, process_sheet, slice_sheet};
