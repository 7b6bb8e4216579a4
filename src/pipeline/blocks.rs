//! Block model builder: raw layout regions → ordered, ID-stable blocks.
//!
//! This stage is a pure function of its input. IDs come from the region's
//! position in the snapshot (never from spatial order), so two builds of the
//! same snapshot always yield the same `block_NNN` sequence and the anchors
//! rendered from them stay stable across requests.
//!
//! A region with an unreadable box degrades to [`BBox::ZERO`] instead of
//! failing the page: one bad detection must not hide the rest of the layout.

use crate::model::{
    block_id, BBox, Block, BlockContent, BlockType, Correction, LayoutSnapshot, PageSize,
    RawRegion, Segment,
};
use crate::pipeline::labels;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Blocks of one page plus the reference size their coordinates refer to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockModel {
    pub blocks: Vec<Block>,
    pub page: PageSize,
}

/// Normalize a job's layout snapshot into blocks.
///
/// `None` means the layout model has not produced anything for the job yet.
/// That is a valid state: the result is an empty block list on a page of
/// the `fallback` size.
pub fn build_blocks(snapshot: Option<&LayoutSnapshot>, fallback: PageSize) -> BlockModel {
    let Some(snapshot) = snapshot else {
        return BlockModel {
            blocks: Vec::new(),
            page: fallback,
        };
    };

    let page = PageSize {
        width: snapshot
            .width
            .filter(|w| *w > 0)
            .unwrap_or(fallback.width),
        height: snapshot
            .height
            .filter(|h| *h > 0)
            .unwrap_or(fallback.height),
    };

    let blocks: Vec<Block> = snapshot
        .regions
        .iter()
        .enumerate()
        .map(|(index, region)| build_block(index, region))
        .collect();

    debug!(
        "Built {} blocks on a {}x{} page",
        blocks.len(),
        page.width,
        page.height
    );

    BlockModel { blocks, page }
}

fn build_block(index: usize, region: &RawRegion) -> Block {
    let id = block_id(index);
    let block_type = labels::normalize(&region.label);

    let bbox = parse_bbox(&region.bbox).unwrap_or_else(|| {
        warn!(
            "Region {} has an unreadable bbox ({}); using a zero box",
            id, region.bbox
        );
        BBox::ZERO
    });

    Block {
        id,
        block_type,
        bbox,
        confidence: region
            .score
            .filter(|s| s.is_finite())
            .map(|s| s.clamp(0.0, 1.0)),
        content: classify_content(block_type, &region.content),
        corrected: false,
    }
}

// ── Boxes ────────────────────────────────────────────────────────────────

/// Read a raw box in any of the shapes layout models emit.
///
/// * `[x1, y1, x2, y2]` or `[[x1, y1], [x2, y2]]` — two points
/// * `[x1, y1, …, x4, y4]` or `[[x, y]; 4]` — four corners (axis-aligned
///   envelope is taken, so rotated quads still produce a usable box)
/// * `{x, y, width, height}` — already normalized
///
/// Returns `None` for any other arity or for non-numeric entries.
pub fn parse_bbox(raw: &Value) -> Option<BBox> {
    match raw {
        Value::Array(items) if items.iter().all(Value::is_array) => {
            let points: Vec<(f64, f64)> = items
                .iter()
                .map(|p| match p.as_array().map(Vec::as_slice) {
                    Some([x, y]) => Some((number(x)?, number(y)?)),
                    _ => None,
                })
                .collect::<Option<_>>()?;
            match points.len() {
                2 => Some(BBox::from_corners(
                    points[0].0,
                    points[0].1,
                    points[1].0,
                    points[1].1,
                )),
                4 => Some(envelope(&points)),
                _ => None,
            }
        }
        Value::Array(items) => {
            let nums: Vec<f64> = items.iter().map(number).collect::<Option<_>>()?;
            match nums.len() {
                4 => Some(BBox::from_corners(nums[0], nums[1], nums[2], nums[3])),
                8 => {
                    let points: Vec<(f64, f64)> =
                        nums.chunks_exact(2).map(|c| (c[0], c[1])).collect();
                    Some(envelope(&points))
                }
                _ => None,
            }
        }
        Value::Object(map) => {
            let get = |k: &str| map.get(k).and_then(number);
            let (x, y) = (get("x")?, get("y")?);
            Some(BBox::from_corners(
                x,
                y,
                x + get("width")?,
                y + get("height")?,
            ))
        }
        _ => None,
    }
}

fn number(v: &Value) -> Option<f64> {
    v.as_f64().filter(|n| n.is_finite())
}

fn envelope(points: &[(f64, f64)]) -> BBox {
    let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
    let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in points {
        x0 = x0.min(x);
        y0 = y0.min(y);
        x1 = x1.max(x);
        y1 = y1.max(y);
    }
    BBox::from_corners(x0, y0, x1, y1)
}

// ── Content ──────────────────────────────────────────────────────────────

/// Decide the content variant of a region once, at ingestion.
pub fn classify_content(block_type: BlockType, raw: &Value) -> BlockContent {
    match raw {
        Value::Null => BlockContent::default(),
        Value::String(s) => classify_text(block_type, s),
        Value::Array(items) => BlockContent::RichText(items.iter().filter_map(segment).collect()),
        Value::Object(map) => {
            if let Some(html) = map.get("html").and_then(Value::as_str) {
                BlockContent::TableHtml(html.to_string())
            } else if let Some(text) = map
                .get("text")
                .or_else(|| map.get("content"))
                .and_then(Value::as_str)
            {
                classify_text(block_type, text)
            } else {
                BlockContent::default()
            }
        }
        Value::Bool(b) => BlockContent::PlainText(b.to_string()),
        Value::Number(n) => BlockContent::PlainText(n.to_string()),
    }
}

fn classify_text(block_type: BlockType, text: &str) -> BlockContent {
    if block_type == BlockType::Table && looks_like_table_html(text) {
        BlockContent::TableHtml(text.to_string())
    } else {
        BlockContent::PlainText(text.to_string())
    }
}

fn looks_like_table_html(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("<table") || lower.contains("<tr")
}

fn segment(item: &Value) -> Option<Segment> {
    match item {
        Value::String(s) => Some(Segment {
            text: s.clone(),
            label: None,
        }),
        Value::Object(map) => {
            let text = map
                .get("text")
                .or_else(|| map.get("content"))
                .and_then(Value::as_str)?;
            let label = map
                .get("type")
                .or_else(|| map.get("label"))
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(Segment {
                text: text.to_string(),
                label,
            })
        }
        _ => None,
    }
}

// ── Corrections ──────────────────────────────────────────────────────────

/// Overlay reviewer corrections on freshly built blocks.
///
/// Corrections are addressed by 0-based block index. An index past the end
/// of the current layout is skipped (it stays in the store; the layout may
/// grow when it is reloaded). Returns how many blocks were overridden.
pub fn apply_corrections<'a>(
    blocks: &mut [Block],
    corrections: impl IntoIterator<Item = &'a Correction>,
) -> usize {
    let mut applied = 0;
    for correction in corrections {
        let Some(block) = blocks.get_mut(correction.block_index) else {
            debug!(
                "Correction for block index {} is outside the layout ({} blocks)",
                correction.block_index,
                blocks.len()
            );
            continue;
        };
        block.content = match correction.table_html.as_deref() {
            Some(html) if !html.trim().is_empty() => BlockContent::TableHtml(html.to_string()),
            _ => classify_text(block.block_type, &correction.corrected_text),
        };
        block.corrected = true;
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn region(label: &str, bbox: Value, content: Value) -> RawRegion {
        RawRegion {
            label: label.into(),
            bbox,
            score: None,
            content,
        }
    }

    #[test]
    fn ids_follow_input_order_not_position() {
        // Second region sits above the first on the page; IDs must not care.
        let snap = LayoutSnapshot::new(vec![
            region("text", json!([0, 500, 10, 510]), json!("lower")),
            region("text", json!([0, 10, 10, 20]), json!("upper")),
            region("text", json!([0, 250, 10, 260]), json!("middle")),
        ]);
        let model = build_blocks(Some(&snap), PageSize::default());
        let ids: Vec<&str> = model.blocks.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["block_001", "block_002", "block_003"]);
        assert_eq!(model.blocks[1].content.text(), "upper");
    }

    #[test]
    fn two_builds_are_identical() {
        let snap = LayoutSnapshot::new(vec![
            region("doc_title", json!([1, 2, 3, 4]), json!("T")),
            region("table", json!([5, 6, 7, 8]), json!("<table></table>")),
        ]);
        let a = build_blocks(Some(&snap), PageSize::default());
        let b = build_blocks(Some(&snap), PageSize::default());
        assert_eq!(a, b);
    }

    #[test]
    fn absent_layout_is_empty_with_fallback_page() {
        let model = build_blocks(None, PageSize::default());
        assert!(model.blocks.is_empty());
        assert!(model.page.width > 0 && model.page.height > 0);
    }

    #[test]
    fn snapshot_page_size_wins_over_fallback() {
        let snap = LayoutSnapshot::new(vec![]).with_page_size(800, 0);
        let model = build_blocks(Some(&snap), PageSize::default());
        assert_eq!(model.page.width, 800);
        assert_eq!(model.page.height, PageSize::default().height);
    }

    #[test]
    fn two_point_box() {
        let b = parse_bbox(&json!([100, 50, 500, 80])).unwrap();
        assert_eq!(
            b,
            BBox {
                x: 100,
                y: 50,
                width: 400,
                height: 30
            }
        );
    }

    #[test]
    fn four_corner_box_takes_envelope() {
        let nested = json!([[110, 40], [500, 50], [490, 90], [100, 80]]);
        let flat = json!([110, 40, 500, 50, 490, 90, 100, 80]);
        let expected = BBox {
            x: 100,
            y: 40,
            width: 400,
            height: 50,
        };
        assert_eq!(parse_bbox(&nested), Some(expected));
        assert_eq!(parse_bbox(&flat), Some(expected));
    }

    #[test]
    fn degenerate_two_point_box_clamps() {
        let b = parse_bbox(&json!([500, 80, 100, 50])).unwrap();
        assert_eq!((b.width, b.height), (0, 0));
    }

    #[test]
    fn object_box_is_accepted() {
        let b = parse_bbox(&json!({"x": 1.4, "y": 2, "width": 10, "height": 5})).unwrap();
        assert_eq!(b, BBox { x: 1, y: 2, width: 10, height: 5 });
    }

    #[test]
    fn malformed_box_degrades_to_zero_without_breaking_page() {
        let snap = LayoutSnapshot::new(vec![
            region("text", json!([1, 2, 3]), json!("bad arity")),
            region("text", json!(["a", "b", "c", "d"]), json!("non numeric")),
            region("text", Value::Null, json!("missing")),
            region("text", json!([0, 0, 10, 10]), json!("fine")),
        ]);
        let model = build_blocks(Some(&snap), PageSize::default());
        assert_eq!(model.blocks.len(), 4);
        for block in &model.blocks[..3] {
            assert_eq!(block.bbox, BBox::ZERO);
        }
        assert_eq!(model.blocks[3].bbox.width, 10);
    }

    #[test]
    fn missing_score_is_none_and_zero_score_is_kept() {
        let mut scored = region("text", json!([0, 0, 1, 1]), json!("a"));
        scored.score = Some(0.0);
        let mut wild = region("text", json!([0, 0, 1, 1]), json!("b"));
        wild.score = Some(1.7);
        let snap = LayoutSnapshot::new(vec![
            region("text", json!([0, 0, 1, 1]), json!("c")),
            scored,
            wild,
        ]);
        let model = build_blocks(Some(&snap), PageSize::default());
        assert_eq!(model.blocks[0].confidence, None);
        assert_eq!(model.blocks[1].confidence, Some(0.0));
        assert_eq!(model.blocks[2].confidence, Some(1.0));
    }

    #[test]
    fn content_shapes_are_classified_once() {
        assert_eq!(
            classify_content(BlockType::Table, &json!("<table><tr><td>1</td></tr></table>")),
            BlockContent::TableHtml("<table><tr><td>1</td></tr></table>".into())
        );
        assert_eq!(
            classify_content(BlockType::Text, &json!("<tr> is a tag")),
            BlockContent::PlainText("<tr> is a tag".into())
        );
        assert_eq!(
            classify_content(BlockType::Table, &json!({"html": "<table/>"})),
            BlockContent::TableHtml("<table/>".into())
        );
        assert_eq!(
            classify_content(BlockType::Text, &json!({"text": "hi"})),
            BlockContent::PlainText("hi".into())
        );
        let rich = classify_content(
            BlockType::Text,
            &json!(["a", {"text": "b", "type": "formula"}, 7, {"bogus": 1}]),
        );
        match rich {
            BlockContent::RichText(segs) => {
                assert_eq!(segs.len(), 2);
                assert_eq!(segs[1].label.as_deref(), Some("formula"));
            }
            other => panic!("expected rich text, got {other:?}"),
        }
        assert_eq!(
            classify_content(BlockType::Figure, &Value::Null),
            BlockContent::PlainText(String::new())
        );
    }

    #[test]
    fn corrections_override_content_by_index() {
        let snap = LayoutSnapshot::new(vec![
            region("text", json!([0, 0, 1, 1]), json!("teh")),
            region("table", json!([0, 0, 1, 1]), json!("<table></table>")),
        ]);
        let mut model = build_blocks(Some(&snap), PageSize::default());
        let corrections = vec![
            Correction {
                block_index: 0,
                original_text: "teh".into(),
                corrected_text: "the".into(),
                table_html: None,
                timestamp: Utc::now(),
            },
            Correction {
                block_index: 1,
                original_text: String::new(),
                corrected_text: "ignored for tables with html".into(),
                table_html: Some("<table><tr><td>x</td></tr></table>".into()),
                timestamp: Utc::now(),
            },
            Correction {
                block_index: 9,
                original_text: String::new(),
                corrected_text: "beyond layout".into(),
                table_html: None,
                timestamp: Utc::now(),
            },
        ];
        let applied = apply_corrections(&mut model.blocks, &corrections);
        assert_eq!(applied, 2);
        assert_eq!(model.blocks[0].content.text(), "the");
        assert!(model.blocks[0].corrected);
        assert!(matches!(model.blocks[1].content, BlockContent::TableHtml(ref h) if h.contains("x")));
    }
}
