//! Anchor-Markdown renderer: block sequence → editable Markdown + anchor index.
//!
//! ## Output shape
//!
//! ```text
//! <!-- @block:block_001 100,50,400,30 -->
//! # Quarterly Report
//!
//! <!-- @block:block_002 100,320,400,180 -->
//! | A |
//! | --- |
//! ```
//!
//! One anchor line per block, immediately followed by the block body; blocks
//! separated by exactly one blank line. Block bodies never contain a blank
//! line themselves, and a body line that would parse as an anchor is escaped,
//! so re-parsing the output finds exactly one anchor per block.
//!
//! The anchor index is collected in the same pass that writes the text, so
//! the two agree by construction. Going the other way (edited text → blocks)
//! is deliberately not supported: once a reviewer saves the Markdown, the
//! text is the truth.

use crate::model::{Block, BlockContent, BlockType};
use crate::pipeline::anchor::{format_anchor, is_anchor_line, Anchor};
use crate::pipeline::table::html_to_pipe_table;
use serde::{Deserialize, Serialize};

/// Text used in place of content the renderer cannot produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Whole-document text when the job has no blocks yet.
    pub empty_message: String,
    pub figure_placeholder: String,
    pub equation_placeholder: String,
    /// Used when a table's HTML yields no rows.
    pub table_placeholder: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            empty_message: "*No layout has been detected for this document yet.*".to_string(),
            figure_placeholder: "[figure]".to_string(),
            equation_placeholder: "[equation]".to_string(),
            table_placeholder: "[table]".to_string(),
        }
    }
}

/// Rendered document plus the anchors written into it, in block order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedMarkdown {
    pub markdown: String,
    pub anchors: Vec<Anchor>,
}

/// Render blocks into anchor-annotated Markdown.
pub fn render_markdown(blocks: &[Block], options: &RenderOptions) -> RenderedMarkdown {
    if blocks.is_empty() {
        return RenderedMarkdown {
            markdown: format!("{}\n", options.empty_message.trim_end()),
            anchors: Vec::new(),
        };
    }

    let mut chunks = Vec::with_capacity(blocks.len());
    let mut anchors = Vec::with_capacity(blocks.len());

    for block in blocks {
        let mut chunk = format_anchor(&block.id, &block.bbox);
        let body = render_body(block, options);
        if !body.is_empty() {
            chunk.push('\n');
            chunk.push_str(&body);
        }
        chunks.push(chunk);
        anchors.push(Anchor {
            block_id: block.id.clone(),
            bbox: block.bbox,
        });
    }

    let mut markdown = chunks.join("\n\n");
    markdown.push('\n');
    RenderedMarkdown { markdown, anchors }
}

fn render_body(block: &Block, options: &RenderOptions) -> String {
    match block.block_type {
        // An undetected title still renders as an (empty) heading so the
        // reviewer sees where it goes.
        BlockType::Title => format!("# {}", single_line(&block.content.text()))
            .trim_end()
            .to_string(),
        BlockType::Table => match &block.content {
            BlockContent::TableHtml(html) => {
                html_to_pipe_table(html).unwrap_or_else(|| options.table_placeholder.clone())
            }
            other => or_placeholder(paragraph(&other.text()), &options.table_placeholder),
        },
        BlockType::Figure => {
            or_placeholder(content_body(&block.content), &options.figure_placeholder)
        }
        BlockType::Equation => {
            or_placeholder(content_body(&block.content), &options.equation_placeholder)
        }
        BlockType::Text | BlockType::Header | BlockType::Footer => content_body(&block.content),
    }
}

/// Body for non-title, non-table kinds. HTML content still renders as a
/// table regardless of the block kind it arrived on.
fn content_body(content: &BlockContent) -> String {
    match content {
        BlockContent::TableHtml(html) => html_to_pipe_table(html).unwrap_or_default(),
        other => paragraph(&other.text()),
    }
}

fn or_placeholder(body: String, placeholder: &str) -> String {
    if body.is_empty() {
        placeholder.to_string()
    } else {
        body
    }
}

/// Normalise free text into a paragraph with no blank lines.
fn paragraph(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            if is_anchor_line(line) {
                format!("\\{line}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{block_id, BBox, Segment};
    use crate::pipeline::anchor::parse_anchors;

    fn block(index: usize, block_type: BlockType, content: BlockContent) -> Block {
        Block {
            id: block_id(index),
            block_type,
            bbox: BBox {
                x: index as i64 * 10,
                y: 5,
                width: 100,
                height: 20,
            },
            confidence: None,
            content,
            corrected: false,
        }
    }

    fn text(s: &str) -> BlockContent {
        BlockContent::PlainText(s.to_string())
    }

    #[test]
    fn empty_layout_renders_placeholder_message() {
        let out = render_markdown(&[], &RenderOptions::default());
        assert!(out.anchors.is_empty());
        assert!(out.markdown.contains("No layout"));
        assert!(parse_anchors(&out.markdown).is_empty());
    }

    #[test]
    fn title_and_table_example() {
        let blocks = vec![
            Block {
                bbox: BBox {
                    x: 100,
                    y: 50,
                    width: 400,
                    height: 30,
                },
                ..block(0, BlockType::Title, text("Annual Report"))
            },
            block(
                1,
                BlockType::Table,
                BlockContent::TableHtml("<table><tr><th>A</th></tr></table>".into()),
            ),
        ];
        let out = render_markdown(&blocks, &RenderOptions::default());
        let expected = "<!-- @block:block_001 100,50,400,30 -->\n# Annual Report\n\n\
                        <!-- @block:block_002 10,5,100,20 -->\n| A |\n| --- |\n";
        assert_eq!(out.markdown, expected);
        assert_eq!(out.anchors.len(), 2);
    }

    #[test]
    fn anchors_round_trip_through_text() {
        let blocks = vec![
            block(0, BlockType::Header, text("ACME Corp")),
            block(1, BlockType::Text, text("line one\r\n\r\n  line two  ")),
            block(2, BlockType::Figure, text("")),
            block(3, BlockType::Equation, BlockContent::default()),
            block(
                4,
                BlockType::Text,
                BlockContent::RichText(vec![Segment {
                    text: "rich".into(),
                    label: None,
                }]),
            ),
            block(5, BlockType::Footer, text("Page 1")),
        ];
        let out = render_markdown(&blocks, &RenderOptions::default());
        assert_eq!(parse_anchors(&out.markdown), out.anchors);
        assert_eq!(out.anchors.len(), blocks.len());
    }

    #[test]
    fn blocks_are_separated_by_exactly_one_blank_line() {
        let blocks = vec![
            block(0, BlockType::Text, text("a\n\n\n\nb")),
            block(1, BlockType::Text, text("")),
            block(2, BlockType::Text, text("c")),
        ];
        let out = render_markdown(&blocks, &RenderOptions::default());
        assert!(!out.markdown.contains("\n\n\n"));
        assert_eq!(out.markdown.matches("\n\n").count(), 2);
        assert!(out.markdown.ends_with("c\n"));
    }

    #[test]
    fn empty_figure_and_equation_use_placeholders() {
        let blocks = vec![
            block(0, BlockType::Figure, text("  ")),
            block(1, BlockType::Equation, text("")),
            block(2, BlockType::Figure, text("Figure 3: throughput")),
        ];
        let out = render_markdown(&blocks, &RenderOptions::default());
        assert!(out.markdown.contains("-->\n[figure]\n"));
        assert!(out.markdown.contains("-->\n[equation]\n"));
        assert!(out.markdown.contains("Figure 3: throughput"));
    }

    #[test]
    fn multi_line_title_becomes_one_heading() {
        let out = render_markdown(
            &[block(0, BlockType::Title, text("Annual\n  Report"))],
            &RenderOptions::default(),
        );
        assert!(out.markdown.contains("\n# Annual Report\n"));
    }

    #[test]
    fn empty_title_is_an_empty_heading() {
        let out = render_markdown(
            &[block(0, BlockType::Title, BlockContent::default())],
            &RenderOptions::default(),
        );
        assert_eq!(out.markdown, "<!-- @block:block_001 0,5,100,20 -->\n#\n");
    }

    #[test]
    fn anchor_lookalike_content_is_escaped() {
        let sneaky = "<!-- @block:block_099 1,1,1,1 -->";
        let blocks = vec![block(0, BlockType::Text, text(sneaky))];
        let out = render_markdown(&blocks, &RenderOptions::default());
        let reparsed = parse_anchors(&out.markdown);
        assert_eq!(reparsed.len(), 1);
        assert_eq!(reparsed[0].block_id, "block_001");
    }

    #[test]
    fn unparseable_table_html_uses_placeholder() {
        let blocks = vec![
            block(0, BlockType::Table, BlockContent::TableHtml("<table></table>".into())),
            block(1, BlockType::Table, text("Plain caption only")),
        ];
        let out = render_markdown(&blocks, &RenderOptions::default());
        assert!(out.markdown.contains("-->\n[table]\n"));
        assert!(out.markdown.contains("Plain caption only"));
    }
}
