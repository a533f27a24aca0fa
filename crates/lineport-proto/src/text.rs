use bytes::{Bytes, BytesMut};

use crate::error::{ProtocolError, Result};
use crate::limits::Limits;

/// One frame's payload: the raw bytes of a line, trailing `\n` included when
/// the source had one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    content: Bytes,
}

impl Line {
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Whether the line carries its own terminator.
    pub fn is_terminated(&self) -> bool {
        self.content.last() == Some(&b'\n')
    }
}

impl AsRef<[u8]> for Line {
    fn as_ref(&self) -> &[u8] {
        &self.content
    }
}

/// An ordered sequence of lines, bounded by [`Limits`].
#[derive(Debug, Clone)]
pub struct TextFile {
    lines: Vec<Line>,
    limits: Limits,
}

impl TextFile {
    pub fn new(limits: Limits) -> Self {
        Self {
            lines: Vec::new(),
            limits,
        }
    }

    /// Pre-size for `expected` lines, capped at the line limit.
    pub fn with_capacity(limits: Limits, expected: usize) -> Self {
        Self {
            lines: Vec::with_capacity(expected.min(limits.max_lines)),
            limits,
        }
    }

    /// Build from existing lines, checking every bound.
    pub fn from_lines<I, L>(limits: Limits, lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = L>,
        L: Into<Bytes>,
    {
        let mut file = Self::new(limits);
        for line in lines {
            file.push(Line::new(line))?;
        }
        Ok(file)
    }

    /// Append a line.
    pub fn push(&mut self, line: Line) -> Result<()> {
        let number = self.lines.len() + 1;
        if self.lines.len() >= self.limits.max_lines {
            return Err(ProtocolError::TooManyLines {
                count: number,
                max: self.limits.max_lines,
            }
            .into());
        }
        if line.len() > self.limits.max_line_len {
            return Err(ProtocolError::LineTooLong {
                line: number,
                len: line.len(),
                max: self.limits.max_line_len,
            }
            .into());
        }
        if line.is_empty() {
            return Err(ProtocolError::EmptyLine { line: number }.into());
        }
        self.lines.push(line);
        Ok(())
    }

    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.lines.iter().map(Line::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Line> {
        self.lines.iter()
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Concatenate all lines, exactly as they would land on disk.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.total_bytes());
        for line in &self.lines {
            out.extend_from_slice(line.as_ref());
        }
        out.freeze()
    }
}

impl<'a> IntoIterator for &'a TextFile {
    type Item = &'a Line;
    type IntoIter = std::slice::Iter<'a, Line>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransferError;

    #[test]
    fn santa_lines_total_thirteen_bytes() {
        let file = TextFile::from_lines(
            Limits::default(),
            [&b"Santa\n"[..], &b"Tell\n"[..], &b"Me\n"[..]],
        )
        .unwrap();

        assert_eq!(file.total_lines(), 3);
        assert_eq!(file.total_bytes(), 13);
        assert_eq!(file.to_bytes().as_ref(), b"Santa\nTell\nMe\n");
    }

    #[test]
    fn rejects_line_over_limit() {
        let limits = Limits {
            max_line_len: 4,
            ..Limits::default()
        };
        let err = TextFile::from_lines(limits, [&b"ok\n"[..], &b"toolong\n"[..]]).unwrap_err();
        assert!(matches!(
            err,
            TransferError::Protocol(ProtocolError::LineTooLong {
                line: 2,
                len: 8,
                max: 4
            })
        ));
    }

    #[test]
    fn rejects_too_many_lines() {
        let limits = Limits {
            max_lines: 2,
            ..Limits::default()
        };
        let err = TextFile::from_lines(limits, [&b"a\n"[..], &b"b\n"[..], &b"c\n"[..]])
            .unwrap_err();
        assert!(matches!(
            err,
            TransferError::Protocol(ProtocolError::TooManyLines { count: 3, max: 2 })
        ));
    }

    #[test]
    fn rejects_empty_line() {
        let mut file = TextFile::new(Limits::default());
        let err = file.push(Line::new(Bytes::new())).unwrap_err();
        assert!(matches!(
            err,
            TransferError::Protocol(ProtocolError::EmptyLine { line: 1 })
        ));
    }

    #[test]
    fn terminator_detection() {
        assert!(Line::new(&b"x\n"[..]).is_terminated());
        assert!(!Line::new(&b"x"[..]).is_terminated());
    }

    #[test]
    fn capacity_is_capped_by_limits() {
        let limits = Limits {
            max_lines: 8,
            ..Limits::default()
        };
        let file = TextFile::with_capacity(limits, 1_000_000);
        assert!(file.lines.capacity() < 1_000_000);
    }
}
