//! Small text-rendering helpers shared by every diff record's `Display` impl
//!
//! Names and values that appear inside a rendered message are wrapped with
//! [`HL_OPEN`]/[`HL_CLOSE`] sentinels rather than being colored directly. A
//! rendering collaborator decides, after the fact, whether those sentinels
//! become ANSI color codes, backtick-quotes, or nothing at all.

use std::fmt;

/// Opening highlight sentinel
pub const HL_OPEN: &str = "\u{2045}";
/// Closing highlight sentinel
pub const HL_CLOSE: &str = "\u{2046}";

/// Wrap a value in highlight sentinels for later rendering
pub fn hl(what: impl fmt::Display) -> String {
    format!("{HL_OPEN}{what}{HL_CLOSE}")
}

/// Pluralize a noun based on the size of a collection
pub fn pluralize(name: &str, count: usize) -> String {
    if count == 1 {
        name.to_string()
    } else {
        format!("{name}s")
    }
}

/// Render a sorted, comma-separated, highlighted list
pub fn hlistify<I, T>(items: I) -> String
where
    I: IntoIterator<Item = T>,
    T: fmt::Display,
{
    items
        .into_iter()
        .map(hl)
        .collect::<Vec<_>>()
        .join(", ")
}

/// How highlight sentinels should be resolved into final output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Replace sentinels with ANSI color codes (bold cyan)
    Color,
    /// Replace sentinels with backtick-quotes, for plain-text terminals
    Quotes,
    /// Strip sentinels entirely
    Plain,
}

/// Resolve highlight sentinels embedded in `message` into the requested style
pub fn render(message: &str, style: Style) -> String {
    let (open, close) = match style {
        Style::Color => ("\u{1b}[1;36m", "\u{1b}[0m"),
        Style::Quotes => ("`", "'"),
        Style::Plain => ("", ""),
    };
    message.replace(HL_OPEN, open).replace(HL_CLOSE, close)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pluralize_singular_and_plural() {
        assert_eq!(pluralize("function", 1), "function");
        assert_eq!(pluralize("function", 2), "functions");
        assert_eq!(pluralize("function", 0), "functions");
    }

    #[test]
    fn render_quotes_strips_sentinels_correctly() {
        let msg = hl("foo");
        assert_eq!(render(&msg, Style::Quotes), "`foo'");
        assert_eq!(render(&msg, Style::Plain), "foo");
    }

    #[test]
    fn hlistify_joins_multiple_items() {
        let rendered = hlistify(["a", "b"]);
        assert_eq!(render(&rendered, Style::Quotes), "`a', `b'");
    }
}
