//! Byte-offset source spans.
//!
//! Spans are half-open `[start, end)` byte ranges into the original
//! script text. The external parser tags every term with one; the
//! checker and evaluator only ever carry them through to diagnostics.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

/// A half-open byte range into the source text.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start must not exceed end");
        Span { start, end }
    }

    /// A zero-length span at a single offset.
    pub fn point(offset: usize) -> Self {
        Span { start: offset, end: offset }
    }

    /// The smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span covers zero bytes.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl From<Span> for Range<usize> {
    fn from(s: Span) -> Range<usize> {
        s.start..s.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_covers_both() {
        let a = Span::new(4, 9);
        let b = Span::new(7, 15);
        assert_eq!(a.merge(b), Span::new(4, 15));
        assert_eq!(b.merge(a), Span::new(4, 15));
    }

    #[test]
    fn display_is_start_dash_end() {
        assert_eq!(Span::new(12, 19).to_string(), "12-19");
    }

    #[test]
    fn point_is_empty() {
        assert!(Span::point(3).is_empty());
        assert!(!Span::new(3, 4).is_empty());
    }
}
