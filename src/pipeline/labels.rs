//! Raw layout label → canonical [`BlockType`] mapping.
//!
//! Layout models disagree on vocabulary (`doc_title` vs `paragraph_title`,
//! `image` vs `chart`, `formula` vs `equation`). The table below folds every
//! known synonym onto one of the seven canonical kinds. The mapping is total:
//! anything not listed becomes [`BlockType::Text`], so no raw label ever
//! reaches the renderer unmapped.

use crate::model::BlockType;

/// Synonym table. Keys are already folded (lowercase, `_` separators).
const SYNONYMS: &[(&str, BlockType)] = &[
    ("title", BlockType::Title),
    ("doc_title", BlockType::Title),
    ("document_title", BlockType::Title),
    ("paragraph_title", BlockType::Title),
    ("text", BlockType::Text),
    ("header", BlockType::Header),
    ("page_header", BlockType::Header),
    ("footer", BlockType::Footer),
    ("page_footer", BlockType::Footer),
    ("footnote", BlockType::Footer),
    ("figure", BlockType::Figure),
    ("image", BlockType::Figure),
    ("picture", BlockType::Figure),
    ("chart", BlockType::Figure),
    ("seal", BlockType::Figure),
    ("header_image", BlockType::Figure),
    ("footer_image", BlockType::Figure),
    ("table", BlockType::Table),
    ("equation", BlockType::Equation),
    ("formula", BlockType::Equation),
    ("isolate_formula", BlockType::Equation),
    ("display_formula", BlockType::Equation),
];

/// Map a raw label onto its canonical block type.
///
/// Case, surrounding whitespace, inner spaces and hyphens are ignored, so
/// `"Document Title"`, `"document-title"` and `"doc_title"` all land on
/// [`BlockType::Title`]. Canonical names map to themselves.
pub fn normalize(raw: &str) -> BlockType {
    let folded = fold(raw);
    SYNONYMS
        .iter()
        .find(|(label, _)| *label == folded)
        .map(|(_, kind)| *kind)
        .unwrap_or(BlockType::Text)
}

fn fold(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}
