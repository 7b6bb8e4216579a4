//! HTML table → GFM pipe table.
//!
//! Layout models return table blocks as HTML fragments. Reviewers edit
//! Markdown, so each fragment is flattened into a pipe table:
//!
//! 1. Split into `<tr>` rows and `<td>`/`<th>` cells
//! 2. Strip inner tags (`<br>` becomes a space), decode entities
//! 3. Collapse whitespace and newlines, escape literal `|`
//! 4. Expand `colspan`, pad every row to the widest row
//! 5. First row is the header, followed by a `| --- |` rule row
//!
//! This is a projection, not an HTML parser: malformed markup yields
//! whatever rows the patterns can still find, and `None` when there are none.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>").unwrap());

static RE_CELL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(td|th)\b([^>]*)>(.*?)</(?:td|th)\s*>").unwrap()
});

static RE_COLSPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)colspan\s*=\s*["']?(\d+)"#).unwrap());

static RE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

static RE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Widest `colspan` honoured; larger values are treated as this many columns.
const MAX_COLSPAN: usize = 64;

/// Convert an HTML table fragment into pipe-table lines.
///
/// Returns `None` when the fragment contains no row with at least one cell.
pub fn html_to_pipe_table(html: &str) -> Option<String> {
    let rows: Vec<Vec<String>> = RE_ROW
        .captures_iter(html)
        .map(|row| parse_row(&row[1]))
        .filter(|cells| !cells.is_empty())
        .collect();

    let columns = rows.iter().map(Vec::len).max()?;

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        lines.push(format_row(row, columns));
        if i == 0 {
            lines.push(separator_row(columns));
        }
    }
    Some(lines.join("\n"))
}

fn parse_row(row_html: &str) -> Vec<String> {
    let mut cells = Vec::new();
    for cell in RE_CELL.captures_iter(row_html) {
        cells.push(clean_cell(&cell[3]));
        let span = RE_COLSPAN
            .captures(&cell[2])
            .and_then(|c| c[1].parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_COLSPAN);
        cells.extend(std::iter::repeat_n(String::new(), span - 1));
    }
    cells
}

fn clean_cell(inner: &str) -> String {
    let s = RE_BREAK.replace_all(inner, " ");
    let s = RE_TAG.replace_all(&s, "");
    let s = html_escape::decode_html_entities(&s);
    let s = RE_SPACE.replace_all(&s, " ");
    s.trim().replace('|', "\\|")
}

fn format_row(cells: &[String], columns: usize) -> String {
    let mut line = String::from("|");
    for i in 0..columns {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        line.push(' ');
        line.push_str(cell);
        line.push_str(" |");
    }
    line
}

fn separator_row(columns: usize) -> String {
    std::iter::once("|")
        .chain(std::iter::repeat_n(" --- |", columns))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_header_cell() {
        let md = html_to_pipe_table("<table><tr><th>A</th></tr></table>").unwrap();
        assert_eq!(md, "| A |\n| --- |");
    }

    #[test]
    fn header_and_body_rows() {
        let html = "<table>\n<tr><th>Item</th><th>Qty</th></tr>\n\
                    <tr><td>Bolt</td><td>4</td></tr>\n\
                    <tr><td>Nut</td><td>8</td></tr></table>";
        let md = html_to_pipe_table(html).unwrap();
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(
            lines,
            [
                "| Item | Qty |",
                "| --- | --- |",
                "| Bolt | 4 |",
                "| Nut | 8 |"
            ]
        );
    }

    #[test]
    fn cells_are_unescaped_and_newline_stripped() {
        let html = "<tr><td>Fish &amp; Chips</td><td>a\n  b<br/>c</td><td>&lt;5&#37;&#x21;</td></tr>";
        let md = html_to_pipe_table(html).unwrap();
        assert_eq!(md.lines().next().unwrap(), "| Fish & Chips | a b c | <5%! |");
    }

    #[test]
    fn pipes_inside_cells_are_escaped() {
        let md = html_to_pipe_table("<tr><td>a|b</td></tr>").unwrap();
        assert!(md.starts_with("| a\\|b |"), "got: {md}");
    }

    #[test]
    fn short_rows_are_padded_and_colspan_expanded() {
        let html = "<tr><th colspan=\"2\">Total</th><th>X</th></tr><tr><td>1</td></tr>";
        let md = html_to_pipe_table(html).unwrap();
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines[0], "| Total |  | X |");
        assert_eq!(lines[1], "| --- | --- | --- |");
        assert_eq!(lines[2], "| 1 |  |  |");
    }

    #[test]
    fn nested_markup_is_stripped() {
        let md = html_to_pipe_table("<tr><td><b>Bold</b> <span class='x'>text</span></td></tr>")
            .unwrap();
        assert!(md.starts_with("| Bold text |"));
    }

    #[test]
    fn no_rows_yields_none() {
        assert_eq!(html_to_pipe_table("<table></table>"), None);
        assert_eq!(html_to_pipe_table("plain words"), None);
        assert_eq!(html_to_pipe_table("<tr></tr>"), None);
    }

    #[test]
    fn named_entities_beyond_the_basics_are_decoded() {
        let md = html_to_pipe_table(
            "<tr><td>Caf&eacute; &laquo;x&raquo; &frac12; &sup2;</td></tr>",
        )
        .unwrap();
        assert_eq!(md.lines().next().unwrap(), "| Café «x» ½ ² |");
    }

    #[test]
    fn unknown_entities_are_kept() {
        let md = html_to_pipe_table("<tr><td>&bogus; &amp;</td></tr>").unwrap();
        assert_eq!(md.lines().next().unwrap(), "| &bogus; & |");
    }
}
