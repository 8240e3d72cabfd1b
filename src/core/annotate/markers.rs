//! Color marker syntax

use crate::core::color::{Color, Scheme};

const HIGH_PREFIX: &str = "{\\color[RGB]{";
const LOW_PREFIX: &str = "\\colorbox[rgb]{";

/// Color spec used for plain (uncolored) rendering.
pub fn plain_spec(scheme: Scheme) -> &'static str {
    match scheme {
        Scheme::High => "0, 0, 0",
        Scheme::Low => "1,1,1",
    }
}

/// Wrap `text` with the marker of `scheme` using a raw color spec.
pub fn wrap_spec(scheme: Scheme, spec: &str, text: &str) -> String {
    match scheme {
        Scheme::High => format!("{}{}}}{}}}", HIGH_PREFIX, spec, text),
        Scheme::Low => format!("{}{}}}{{{}}}", LOW_PREFIX, spec, text),
    }
}

/// `{\color[RGB]{r, g, b}TEXT}` or `\colorbox[rgb]{0.r,0.g,0.b}{TEXT}`.
pub fn wrap(color: &Color, text: &str) -> String {
    wrap_spec(color.scheme(), &color.tex_spec(), text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Brace {
    Plain,
    Marker,
}

/// Remove every color marker, keeping the wrapped text.
///
/// Braces are matched with a stack; `\{`, `\}` and `%` comments are copied
/// untouched.
pub fn strip_color_markers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut stack: Vec<Brace> = Vec::new();
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if let Some(after) = strip_marker_head(rest, HIGH_PREFIX, "}") {
            stack.push(Brace::Marker);
            rest = after;
            continue;
        }
        if let Some(after) = strip_marker_head(rest, LOW_PREFIX, "}{") {
            stack.push(Brace::Marker);
            rest = after;
            continue;
        }
        match c {
            '\\' => {
                let len = rest
                    .char_indices()
                    .nth(2)
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                out.push_str(&rest[..len]);
                rest = &rest[len..];
                continue;
            }
            '%' => {
                let len = rest.find('\n').unwrap_or(rest.len());
                out.push_str(&rest[..len]);
                rest = &rest[len..];
                continue;
            }
            '{' => stack.push(Brace::Plain),
            '}' => {
                if stack.pop() == Some(Brace::Marker) {
                    rest = &rest[1..];
                    continue;
                }
            }
            _ => {}
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// If `text` starts with `prefix`, a color spec and `close`, return what
/// follows.
fn strip_marker_head<'a>(text: &'a str, prefix: &str, close: &str) -> Option<&'a str> {
    let after = text.strip_prefix(prefix)?;
    let end = after.find('}')?;
    let spec = &after[..end];
    if !spec
        .chars()
        .all(|c| c.is_ascii_digit() || c == ',' || c == '.' || c == ' ')
    {
        return None;
    }
    after[end..].strip_prefix(close)
}
