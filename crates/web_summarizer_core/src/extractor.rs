//! crates/web_summarizer_core/src/extractor.rs
//!
//! Turns rendered HTML into the plain text that gets sent to the model.
//! Parsing is best-effort: malformed markup never fails, it just yields less text.

use scraper::{Html, Node};

use crate::domain::ExtractionWarning;

/// Elements whose text never reaches the reader.
const HIDDEN_ELEMENTS: [&str; 2] = ["script", "style"];

/// The text pulled out of a page, plus any non-fatal notice raised on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub warning: Option<ExtractionWarning>,
}

/// Extracts visible text from `html`, capped at `max_chars` characters.
///
/// Script and style subtrees are dropped, every line is trimmed, runs of two or
/// more spaces split a line into fragments, empty fragments are discarded and the
/// rest are joined with single spaces. Text longer than `max_chars` is cut to
/// exactly `max_chars` characters and reported as `ExtractionWarning::Truncated`.
pub fn extract_text(html: &str, max_chars: usize) -> Extraction {
    let document = Html::parse_document(html);
    let raw = visible_text(&document);
    let mut text = collapse_whitespace(&raw);

    let original_chars = text.chars().count();
    let warning = if original_chars > max_chars {
        truncate_chars(&mut text, max_chars);
        Some(ExtractionWarning::Truncated {
            original_chars,
            max_chars,
        })
    } else {
        None
    };

    Extraction { text, warning }
}

fn visible_text(document: &Html) -> String {
    let mut out = String::new();
    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| match ancestor.value() {
            Node::Element(element) => HIDDEN_ELEMENTS.contains(&element.name()),
            _ => false,
        });
        if !hidden {
            out.push_str(text);
        }
    }
    out
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split(is_line_break)
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn truncate_chars(text: &mut String, max_chars: usize) {
    if let Some((byte_index, _)) = text.char_indices().nth(max_chars) {
        text.truncate(byte_index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 100_000;

    #[test]
    fn script_content_is_excluded() {
        let html = "<html><body><script>evil()</script><p>Hello World</p></body></html>";
        let extraction = extract_text(html, LIMIT);
        assert_eq!(extraction.text, "Hello World");
        assert_eq!(extraction.warning, None);
    }

    #[test]
    fn bare_fragment_with_script_is_excluded() {
        let extraction = extract_text("<script>evil()</script><p>Hello World</p>", LIMIT);
        assert_eq!(extraction.text, "Hello World");
    }

    #[test]
    fn style_and_nested_script_are_dropped() {
        let html = r#"
            <html>
              <head><style>body { color: red; }</style></head>
              <body>
                <div>Intro<script type="text/javascript">var x = 1;</script></div>
                <p>Second   paragraph</p>
              </body>
            </html>"#;
        let extraction = extract_text(html, LIMIT);
        assert_eq!(extraction.text, "Intro Second paragraph");
    }

    #[test]
    fn lines_are_trimmed_and_joined_with_single_spaces() {
        let html = "<pre>  first line  \n\n   second  line\r\nthird</pre>";
        let extraction = extract_text(html, LIMIT);
        assert_eq!(extraction.text, "first line second line third");
    }

    #[test]
    fn malformed_html_still_yields_text() {
        let extraction = extract_text("<div><p>unclosed <b>bold</div", LIMIT);
        assert_eq!(extraction.text, "unclosed bold");
    }

    #[test]
    fn empty_document_yields_empty_text() {
        let extraction = extract_text("", LIMIT);
        assert!(extraction.text.is_empty());
        assert!(extraction.warning.is_none());
    }

    #[test]
    fn extraction_is_deterministic() {
        let html = "<body><h1>Title</h1><p>Body  text\n more</p><style>x{}</style></body>";
        let first = extract_text(html, LIMIT);
        let second = extract_text(html, LIMIT);
        assert_eq!(first, second);
    }

    #[test]
    fn long_text_is_cut_to_exactly_the_limit() {
        let html = format!("<p>{}</p>", "a".repeat(250));
        let extraction = extract_text(&html, 100);
        assert_eq!(extraction.text.chars().count(), 100);
        assert_eq!(
            extraction.warning,
            Some(ExtractionWarning::Truncated {
                original_chars: 250,
                max_chars: 100
            })
        );
    }

    #[test]
    fn text_at_the_limit_is_left_alone() {
        let html = format!("<p>{}</p>", "b".repeat(100));
        let extraction = extract_text(&html, 100);
        assert_eq!(extraction.text.chars().count(), 100);
        assert!(extraction.warning.is_none());
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let html = format!("<p>{}</p>", "é".repeat(20));
        let extraction = extract_text(&html, 7);
        assert_eq!(extraction.text, "é".repeat(7));
    }
}
