//! Free-text cleanup for spreadsheet fields.
//!
//! Reference descriptions are frequently pasted from a storefront editor and
//! carry HTML. [`normalize`] strips anything tag-shaped and collapses the
//! remaining whitespace so the text can be embedded in a title or a
//! plain-text description block.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::CellValue;

static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]*>").unwrap());

/// Normalize any cell value to clean single-line text.
///
/// Total over all inputs: absent values yield `""`, numbers their textual
/// form. The result never contains `<`, `>`, or runs of whitespace.
pub fn normalize(raw: &CellValue) -> String {
    match raw {
        CellValue::Text(s) => normalize_text(s),
        other => normalize_text(&other.to_text()),
    }
}

/// Normalize a string: drop markup, then collapse whitespace and trim.
pub fn normalize_text(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let stripped = TAG_PATTERN.replace_all(raw, " ");
    // Unbalanced delimiters survive the tag pass.
    let stripped = stripped.replace(['<', '>'], " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_collapses_whitespace() {
        assert_eq!(
            normalize_text("<p>Para cabello <b>seco</b></p>"),
            "Para cabello seco"
        );
        assert_eq!(normalize_text("  uno\n\n  dos\t tres "), "uno dos tres");
        assert_eq!(normalize_text("uno<br>dos"), "uno dos");
        assert_eq!(normalize_text("<br/>"), "");
    }

    #[test]
    fn stray_delimiters_removed() {
        let out = normalize_text("a < b > c <<x");
        assert!(!out.contains('<') && !out.contains('>'));
        assert!(!out.contains("  "));
        assert_eq!(out, "a c x");
    }

    #[test]
    fn non_text_inputs() {
        assert_eq!(normalize(&CellValue::Empty), "");
        assert_eq!(normalize(&CellValue::Number(42.0)), "42");
        assert_eq!(normalize(&CellValue::Number(f64::NAN)), "");
        assert_eq!(normalize(&CellValue::Bool(false)), "false");
        assert_eq!(normalize(&CellValue::from("  <i>Hola</i>  ")), "Hola");
    }

    #[test]
    fn idempotent() {
        let once = normalize_text("<div>Crema   <span>X</span></div>\n");
        assert_eq!(normalize_text(&once), once);
    }
}
