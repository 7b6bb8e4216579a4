//! Layout → Markdown projection stages.
//!
//! Each submodule implements exactly one transformation step, so each is
//! independently testable and none of them touches storage.
//!
//! ## Data Flow
//!
//! ```text
//! LayoutSnapshot ──▶ blocks ──▶ (corrections overlay) ──▶ render ──▶ Markdown + anchors
//!   (raw regions)    (typed,        (store records)        (anchor,
//!                     ID-stable)                             table)
//! ```
//!
//! 1. [`labels`] — total mapping of raw labels onto the seven block kinds
//! 2. [`blocks`] — normalize regions into `block_NNN` blocks; overlay
//!    reviewer corrections
//! 3. [`table`]  — flatten table HTML into GFM pipe tables
//! 4. [`anchor`] — write and re-parse the invisible per-block anchor lines
//! 5. [`render`] — assemble the anchored Markdown and its anchor index

pub mod anchor;
pub mod blocks;
pub mod labels;
pub mod render;
pub mod table;

pub use anchor::{parse_anchors, Anchor};
pub use blocks::{apply_corrections, build_blocks, BlockModel};
pub use render::{render_markdown, RenderOptions, RenderedMarkdown};
