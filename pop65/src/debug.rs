//! Debug-record templates (`.dbg`) and comment aggregation

use crate::error::{AsmError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Name,
    Comment,
    /// `{V}` or `{V+hex}` / `{V-hex}`
    Value(i32),
}

/// A parsed `.dbg` template.
///
/// `{L}` expands to the label name, `{C}` to its aggregated comment and
/// `{V}` to its value in uppercase hex. `{V-8000}` first adds the signed hex
/// offset. Any other `{...}` is copied as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugTemplate {
    segments: Vec<Segment>,
}

impl DebugTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            let Some(len) = rest[open..].find('}') else {
                break;
            };
            let inner = &rest[open + 1..open + len];
            let segment = match inner {
                "L" => Some(Segment::Name),
                "C" => Some(Segment::Comment),
                "V" => Some(Segment::Value(0)),
                _ => match inner.strip_prefix('V') {
                    Some(offset) => Some(Segment::Value(parse_offset(offset)?)),
                    None => None,
                },
            };
            match segment {
                Some(segment) => {
                    text.push_str(&rest[..open]);
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(segment);
                }
                None => text.push_str(&rest[..=open + len]),
            }
            rest = &rest[open + len + 1..];
        }
        text.push_str(rest);
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        Ok(Self { segments })
    }

    /// Expand the template for one label definition.
    pub fn format(&self, name: &str, value: u16, comment: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Name => out.push_str(name),
                Segment::Comment => out.push_str(&collapse_line_breaks(comment)),
                Segment::Value(offset) => {
                    let sum = i64::from(value) + i64::from(*offset);
                    if sum < 0 {
                        out.push_str(&format!("-{:X}", sum.unsigned_abs()));
                    } else {
                        out.push_str(&format!("{:X}", sum));
                    }
                }
            }
        }
        out
    }
}

fn parse_offset(s: &str) -> Result<i32> {
    let invalid = || AsmError::syntax(format!("invalid offset '{}' in {{V...}}", s));
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let magnitude = i64::from_str_radix(digits, 16).map_err(|_| invalid())?;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).map_err(|_| invalid())
}

fn collapse_line_breaks(s: &str) -> String {
    s.split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Comment-only lines seen since the last blank or code line.
#[derive(Debug, Default)]
pub struct CommentBuffer {
    parts: Vec<String>,
}

impl CommentBuffer {
    pub fn push(&mut self, comment: &str) {
        let comment = comment.trim();
        if !comment.is_empty() {
            self.parts.push(comment.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.parts.clear();
    }

    /// The buffered lines followed by the inline comment, space separated.
    /// Leaves the buffer empty.
    pub fn take_with(&mut self, inline: Option<&str>) -> String {
        self.push(inline.unwrap_or(""));
        let joined = self.parts.join(" ");
        self.parts.clear();
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_basic_template() {
        let t = DebugTemplate::parse("P:{V-8000}:{L}:{C}").unwrap();
        assert_eq!(t.format("foo", 0x8000, "description of foo"), "P:0:foo:description of foo");
        assert_eq!(t.format("bar", 0x8002, "a b"), "P:2:bar:a b");
    }

    #[test]
    fn test_value_formats() {
        let t = DebugTemplate::parse("{V}").unwrap();
        assert_eq!(t.format("x", 0, ""), "0");
        assert_eq!(t.format("x", 0xABC, ""), "ABC");

        let t = DebugTemplate::parse("{V+10}").unwrap();
        assert_eq!(t.format("x", 0xFFFF, ""), "1000F");

        let t = DebugTemplate::parse("{V-8000}").unwrap();
        assert_eq!(t.format("x", 0x10, ""), "-7FF0");
    }

    #[test]
    fn test_unknown_escapes_copied() {
        let t = DebugTemplate::parse("{X}{L}{ unclosed").unwrap();
        assert_eq!(t.format("n", 0, ""), "{X}n{ unclosed");
    }

    #[test]
    fn test_bad_offset() {
        let err = DebugTemplate::parse("{V-zz}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert!(DebugTemplate::parse("{V+}").is_err());
        assert!(DebugTemplate::parse("{V+100000000}").is_err());
    }

    #[test]
    fn test_comment_collapses_line_breaks() {
        let t = DebugTemplate::parse("{C}").unwrap();
        assert_eq!(t.format("x", 0, "one\ntwo\r\nthree"), "one two three");
    }

    #[test]
    fn test_comment_buffer() {
        let mut buf = CommentBuffer::default();
        buf.push(" description of... ");
        buf.push("bar!");
        assert_eq!(buf.take_with(None), "description of... bar!");
        assert_eq!(buf.take_with(Some("inline")), "inline");
        buf.push("stale");
        buf.clear();
        assert_eq!(buf.take_with(None), "");
    }
}
