//! HTML output for rendered blocks and suggestion sets.
//!
//! All model text is escaped; only the markup produced here is emitted raw.

use super::{Block, Inline, Span};
use crate::analysis::model::SuggestionSet;

/// Write blocks as an HTML fragment, one element per line.
pub fn to_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                out.push_str(&format!("<h{level}>{}</h{level}>\n", inline_html(text)));
            }
            Block::List { items } => {
                out.push_str("<ul>\n");
                for item in items {
                    out.push_str(&format!("  <li>{}</li>\n", inline_html(item)));
                }
                out.push_str("</ul>\n");
            }
            Block::Rule => out.push_str("<hr />\n"),
            Block::Paragraph { text } => {
                out.push_str(&format!("<p>{}</p>\n", inline_html(text)));
            }
        }
    }
    out
}

/// Write a suggestion set as a list; the style tag becomes a CSS hook.
pub fn suggestions_to_html(set: &SuggestionSet) -> String {
    let mut out = String::from("<ul class=\"suggestions\">\n");
    for suggestion in &set.suggestions {
        out.push_str(&format!(
            "  <li class=\"suggestion style-{}\"><span class=\"style\">{}</span> <p>{}</p></li>\n",
            css_token(&suggestion.style),
            escape(&suggestion.style),
            escape(&suggestion.text),
        ));
    }
    out.push_str("</ul>\n");
    out
}

pub fn inline_html(inline: &Inline) -> String {
    let mut out = String::new();
    write_spans(inline.spans(), &mut out);
    out
}

fn write_spans(spans: &[Span], out: &mut String) {
    for span in spans {
        match span {
            Span::Text(text) => out.push_str(&escape(text)),
            Span::Strong(inner) => {
                out.push_str("<strong>");
                write_spans(inner, out);
                out.push_str("</strong>");
            }
            Span::Marker(marker) => {
                out.push_str(&format!(
                    "<span class=\"marker marker-{}\">{}</span>",
                    marker.tone().as_str(),
                    marker.glyph()
                ));
            }
            Span::Code(inner) => {
                out.push_str("<code>");
                write_spans(inner, out);
                out.push_str("</code>");
            }
        }
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Lowercase ASCII alphanumerics; everything else becomes `-`.
fn css_token(tag: &str) -> String {
    let token: String = tag
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    if token.is_empty() {
        "other".to_string()
    } else {
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::model::ReplySuggestion;
    use crate::render::render;

    #[test]
    fn test_blocks_to_html() {
        let html = to_html(&render("# Title\n- **a**\n- `b`\n---\nText"));
        assert_eq!(
            html,
            "<h1>Title</h1>\n<ul>\n  <li><strong>a</strong></li>\n  <li><code>b</code></li>\n</ul>\n<hr />\n<p>Text</p>\n"
        );
    }

    #[test]
    fn test_marker_html() {
        let html = to_html(&render("\u{2705} ok"));
        assert_eq!(
            html,
            "<p><span class=\"marker marker-positive\">\u{2705}</span> ok</p>\n"
        );
    }

    #[test]
    fn test_model_text_is_escaped() {
        let html = to_html(&render("<script>alert('x')</script> & **<b>**"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; "));
        assert!(html.contains("<strong>&lt;b&gt;</strong>"));
    }

    #[test]
    fn test_suggestions_html() {
        let set = SuggestionSet {
            suggestions: vec![ReplySuggestion {
                style: "Question".to_string(),
                text: "Why <now>?".to_string(),
            }],
        };
        let html = suggestions_to_html(&set);
        assert!(html.contains("class=\"suggestion style-question\""));
        assert!(html.contains("<p>Why &lt;now&gt;?</p>"));
    }

    #[test]
    fn test_css_token() {
        assert_eq!(css_token("Very Spicy!"), "very-spicy-");
        assert_eq!(css_token("  "), "other");
    }
}
