//! Inline markup: `**strong**`, highlighted status glyphs, `` `code` ``.
//!
//! The three passes run in that order, each over the whole line before the
//! next one starts. Delimiters match non-greedily and unmatched delimiters
//! stay literal.

use serde::Serialize;

/// Visual treatment of a highlighted glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Negative,
    Warning,
    Alert,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Warning => "warning",
            Self::Alert => "alert",
        }
    }
}

/// The status glyphs that get their own treatment. Other emoji are text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    Check,
    Cross,
    Flag,
    Siren,
}

impl Marker {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '\u{2705}' => Some(Self::Check),
            '\u{274C}' => Some(Self::Cross),
            '\u{1F6A9}' => Some(Self::Flag),
            '\u{1F6A8}' => Some(Self::Siren),
            _ => None,
        }
    }

    pub fn glyph(&self) -> char {
        match self {
            Self::Check => '\u{2705}',
            Self::Cross => '\u{274C}',
            Self::Flag => '\u{1F6A9}',
            Self::Siren => '\u{1F6A8}',
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            Self::Check => Tone::Positive,
            Self::Cross => Tone::Negative,
            Self::Flag => Tone::Warning,
            Self::Siren => Tone::Alert,
        }
    }
}

/// One piece of inline content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Span {
    Text(String),
    Strong(Vec<Span>),
    Marker(Marker),
    Code(Vec<Span>),
}

/// Inline-rendered text of a heading, paragraph or list item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Inline(Vec<Span>);

impl Inline {
    pub fn parse(text: &str) -> Self {
        let spans = split_strong(text);
        let spans = map_text(spans, &split_markers);
        let spans = wrap_code(spans);
        Self(spans)
    }

    pub fn spans(&self) -> &[Span] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The text with all markup removed.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.0, &mut out);
        out
    }
}

impl From<Vec<Span>> for Inline {
    fn from(spans: Vec<Span>) -> Self {
        Self(spans)
    }
}

fn collect_text(spans: &[Span], out: &mut String) {
    for span in spans {
        match span {
            Span::Text(s) => out.push_str(s),
            Span::Marker(m) => out.push(m.glyph()),
            Span::Strong(inner) | Span::Code(inner) => collect_text(inner, out),
        }
    }
}

/// Append text, merging with a preceding text span. Empty text is dropped.
fn push_text(out: &mut Vec<Span>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Span::Text(last)) = out.last_mut() {
        last.push_str(text);
    } else {
        out.push(Span::Text(text.to_string()));
    }
}

fn push_span(out: &mut Vec<Span>, span: Span) {
    match span {
        Span::Text(text) => push_text(out, &text),
        other => out.push(other),
    }
}

/// First pass: `**X**` pairs on the raw line.
fn split_strong(text: &str) -> Vec<Span> {
    const DELIM: &str = "**";
    let mut out = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(DELIM) {
        let after_open = &rest[open + DELIM.len()..];
        let Some(close) = after_open.find(DELIM) else {
            break;
        };
        push_text(&mut out, &rest[..open]);
        let mut inner = Vec::new();
        push_text(&mut inner, &after_open[..close]);
        out.push(Span::Strong(inner));
        rest = &after_open[close + DELIM.len()..];
    }
    push_text(&mut out, rest);
    out
}

/// Apply `f` to every text span, recursing into nested spans.
fn map_text(spans: Vec<Span>, f: &dyn Fn(&str) -> Vec<Span>) -> Vec<Span> {
    let mut out = Vec::new();
    for span in spans {
        match span {
            Span::Text(text) => {
                for piece in f(&text) {
                    push_span(&mut out, piece);
                }
            }
            Span::Strong(inner) => out.push(Span::Strong(map_text(inner, f))),
            Span::Code(inner) => out.push(Span::Code(map_text(inner, f))),
            marker @ Span::Marker(_) => out.push(marker),
        }
    }
    out
}

/// Second pass: lift the status glyphs out of text.
fn split_markers(text: &str) -> Vec<Span> {
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        if let Some(marker) = Marker::from_char(c) {
            push_text(&mut out, &text[start..idx]);
            out.push(Span::Marker(marker));
            start = idx + c.len_utf8();
        }
    }
    push_text(&mut out, &text[start..]);
    out
}

/// Third pass: `` `X` `` pairs. A code span may enclose markers produced by
/// the previous pass, but pairs never cross into or out of a strong span.
fn wrap_code(spans: Vec<Span>) -> Vec<Span> {
    let mut out: Vec<Span> = Vec::new();
    let mut open: Option<Vec<Span>> = None;

    for span in spans {
        match span {
            Span::Text(text) => {
                let mut rest = text.as_str();
                while let Some(tick) = rest.find('`') {
                    let before = &rest[..tick];
                    match open.take() {
                        Some(mut code) => {
                            push_text(&mut code, before);
                            out.push(Span::Code(code));
                        }
                        None => {
                            push_text(&mut out, before);
                            open = Some(Vec::new());
                        }
                    }
                    rest = &rest[tick + 1..];
                }
                match open.as_mut() {
                    Some(code) => push_text(code, rest),
                    None => push_text(&mut out, rest),
                }
            }
            Span::Strong(inner) => {
                let strong = Span::Strong(wrap_code(inner));
                match open.as_mut() {
                    Some(code) => code.push(strong),
                    None => out.push(strong),
                }
            }
            other => match open.as_mut() {
                Some(code) => code.push(other),
                None => out.push(other),
            },
        }
    }

    // Unclosed backtick: put it back as literal text.
    if let Some(code) = open {
        push_text(&mut out, "`");
        for span in code {
            push_span(&mut out, span);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Span {
        Span::Text(s.to_string())
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(Inline::parse("just words").spans(), &[text("just words")]);
        assert!(Inline::parse("").is_empty());
    }

    #[test]
    fn test_strong() {
        let inline = Inline::parse("a **b** c **d**");
        assert_eq!(
            inline.spans(),
            &[
                text("a "),
                Span::Strong(vec![text("b")]),
                text(" c "),
                Span::Strong(vec![text("d")]),
            ]
        );
    }

    #[test]
    fn test_strong_is_non_greedy() {
        let inline = Inline::parse("***a**");
        assert_eq!(inline.spans(), &[Span::Strong(vec![text("*a")])]);
    }

    #[test]
    fn test_unclosed_strong_is_literal() {
        assert_eq!(Inline::parse("**open").spans(), &[text("**open")]);
    }

    #[test]
    fn test_markers_get_tones() {
        let inline = Inline::parse("\u{2705} good \u{274C} bad \u{1F6A9} \u{1F6A8}");
        let markers: Vec<Tone> = inline
            .spans()
            .iter()
            .filter_map(|s| match s {
                Span::Marker(m) => Some(m.tone()),
                _ => None,
            })
            .collect();
        assert_eq!(markers, vec![Tone::Positive, Tone::Negative, Tone::Warning, Tone::Alert]);
    }

    #[test]
    fn test_other_emoji_stay_text() {
        assert_eq!(Inline::parse("\u{1F680} launch").spans(), &[text("\u{1F680} launch")]);
    }

    #[test]
    fn test_marker_inside_strong() {
        let inline = Inline::parse("**\u{2705} done**");
        assert_eq!(
            inline.spans(),
            &[Span::Strong(vec![Span::Marker(Marker::Check), text(" done")])]
        );
    }

    #[test]
    fn test_code() {
        let inline = Inline::parse("run `cargo` and `ls`");
        assert_eq!(
            inline.spans(),
            &[
                text("run "),
                Span::Code(vec![text("cargo")]),
                text(" and "),
                Span::Code(vec![text("ls")]),
            ]
        );
    }

    #[test]
    fn test_code_inside_strong() {
        let inline = Inline::parse("**use `x`**");
        assert_eq!(
            inline.spans(),
            &[Span::Strong(vec![text("use "), Span::Code(vec![text("x")])])]
        );
    }

    #[test]
    fn test_code_can_wrap_marker() {
        let inline = Inline::parse("`\u{274C} no`");
        assert_eq!(
            inline.spans(),
            &[Span::Code(vec![Span::Marker(Marker::Cross), text(" no")])]
        );
    }

    #[test]
    fn test_unclosed_code_is_literal() {
        let inline = Inline::parse("a `b \u{2705} c");
        assert_eq!(
            inline.spans(),
            &[text("a `b "), Span::Marker(Marker::Check), text(" c")]
        );
    }

    #[test]
    fn test_plain_text_strips_markup() {
        let inline = Inline::parse("**Bold** and `code` \u{2705}");
        assert_eq!(inline.plain_text(), "Bold and code \u{2705}");
    }
}
