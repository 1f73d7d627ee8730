// SPDX-License-Identifier: MIT
//! # sprite-slice: Sprite Sheet Geometry for Generated Animation Frames
//!
//! This crate holds the pixel-geometry core of the sprite pipeline: working out how a
//! generated sheet is partitioned into cells, and how each cell is fitted onto a fixed
//! frame canvas without distortion.
//!
//! ## Key Components
//!
//! - [`grid`]: Layout inference (columns × rows) from sheet dimensions and frame count,
//!   plus row-major cell rectangles
//! - [`presets`]: Canvas fitting plans (aspect-preserving scale + centered ROI)
//! - [`cpu`]: SIMD resize of RGBA8 pixels into a plan's ROI via fast_image_resize
//!
//! ## Usage Example
//!
//! ```rust
//! use sprite_slice::grid::{cell_rects, infer_layout};
//! use sprite_slice::presets::{fit_plan, Size};
//!
//! // A 2x2 sheet of four 256px poses
//! let layout = infer_layout(512, 512, 4);
//! assert_eq!((layout.columns, layout.rows), (2, 2));
//!
//! let cells = cell_rects(512, 512, layout).unwrap();
//! assert_eq!(cells.len(), 4);
//!
//! // Fit each 256x256 cell onto a 128x96 canvas
//! let plan = fit_plan(Size { w: 256, h: 256 }, Size { w: 128, h: 96 });
//! assert_eq!(plan.dst_roi, (16, 0, 96, 96));
//! ```
//!
//! All functions here are pure: pixels or sizes in, pixels or sizes out. Nothing touches
//! the filesystem.

pub mod cpu;
pub mod grid;
pub mod presets;
