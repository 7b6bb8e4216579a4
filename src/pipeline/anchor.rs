//! Anchor markers binding rendered Markdown back to block positions.
//!
//! Every block in the rendered document is preceded by one line of the form
//!
//! ```text
//! <!-- @block:block_003 120,340,560,48 -->
//! ```
//!
//! carrying the block ID and its box as `x,y,width,height`. An HTML comment
//! is invisible in any Markdown renderer yet trivially regex-extractable, so
//! anchor positions survive arbitrary edits to the surrounding text.

use crate::model::BBox;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A block ID together with the box its anchor line carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    pub block_id: String,
    pub bbox: BBox,
}

static RE_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*<!-- @block:(block_\d+) (-?\d+),(-?\d+),(\d+),(\d+) -->[ \t]*\r?$")
        .unwrap()
});

/// Format the anchor line for a block (no trailing newline).
pub fn format_anchor(block_id: &str, bbox: &BBox) -> String {
    format!(
        "<!-- @block:{} {},{},{},{} -->",
        block_id, bbox.x, bbox.y, bbox.width, bbox.height
    )
}

/// True when `line` on its own would be read back as an anchor.
pub fn is_anchor_line(line: &str) -> bool {
    RE_ANCHOR.is_match(line)
}

/// Extract every anchor from a (possibly reviewer-edited) document, in
/// document order.
///
/// Lines whose numbers do not fit the coordinate type are skipped rather than
/// reported: an anchor a reviewer mangled simply stops being an anchor.
pub fn parse_anchors(text: &str) -> Vec<Anchor> {
    RE_ANCHOR
        .captures_iter(text)
        .filter_map(|caps| {
            Some(Anchor {
                block_id: caps[1].to_string(),
                bbox: BBox {
                    x: caps[2].parse().ok()?,
                    y: caps[3].parse().ok()?,
                    width: caps[4].parse().ok()?,
                    height: caps[5].parse().ok()?,
                },
            })
        })
        .collect()
}
