//! Parsers for the XML documents the pipeline consumes.

pub mod cadastre_wfs;
pub mod poum_gml;

const PREVIEW_CHARS: usize = 600;

/// Trimmed, bounded excerpt of a response body for error messages.
pub(crate) fn preview(text: &str) -> String {
    let trimmed = text.trim();
    let mut out: String = trimmed.chars().take(PREVIEW_CHARS).collect();
    if trimmed.chars().nth(PREVIEW_CHARS).is_some() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn preview_is_bounded() {
        assert_eq!(preview("  short \n"), "short");
        let long = "x".repeat(700);
        let p = preview(&long);
        assert_eq!(p.len(), 603);
        assert!(p.ends_with("..."));
        assert_eq!(preview(&"y".repeat(600)).len(), 600);
    }
}
