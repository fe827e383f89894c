//! Incremental line splitting over a non-blocking byte source.
//!
//! [`LineReader`] pulls raw chunks from any [`Read`] implementation and
//! hands back one logical line per call. `\r`, `\n` and `\r\n` each end a
//! line; a `\r\n` pair counts once even when the two bytes arrive in
//! different chunks. A "would block" from the source is surfaced as
//! [`ReadOutcome::WouldBlock`] so the caller can come back on its next poll.

pub mod fifo;

use std::io::{self, ErrorKind, Read};

use thiserror::Error;

/// Size of a single read from the source, matching the pipe buffer page.
pub const READ_CHUNK_SIZE: usize = 8192;

/// Errors that end the current stream.
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("reading stream: {0}")]
    Io(#[from] io::Error),

    #[error("line is not valid UTF-8 at byte {valid_up_to}")]
    Decode { valid_up_to: usize },
}

/// Result of one pull from a [`LineReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line with its terminator removed.
    Line(String),
    /// No complete line is buffered and the source has nothing more right now.
    WouldBlock,
    /// The source reached end of stream and every buffered byte was returned.
    Eof,
}

/// Splits a byte source into logical lines.
#[derive(Debug)]
pub struct LineReader<R> {
    source: R,
    buf: Vec<u8>,
    chunk: Box<[u8]>,
    /// A line ended on `\r` at the buffer tail; drop a leading `\n` from the next read.
    skip_lf: bool,
    eof: bool,
}

impl<R: Read> LineReader<R> {
    /// Wrap a source. The source should already be in non-blocking mode if
    /// the caller must never stall.
    pub fn new(source: R) -> Self {
        Self {
            source,
            buf: Vec::with_capacity(READ_CHUNK_SIZE),
            chunk: vec![0u8; READ_CHUNK_SIZE].into_boxed_slice(),
            skip_lf: false,
            eof: false,
        }
    }

    /// Pull the next line, reading from the source as needed.
    pub fn next_line(&mut self) -> Result<ReadOutcome, ReaderError> {
        loop {
            if let Some(line) = self.take_line()? {
                return Ok(ReadOutcome::Line(line));
            }

            if self.eof {
                if self.buf.is_empty() {
                    return Ok(ReadOutcome::Eof);
                }
                let rest = std::mem::take(&mut self.buf);
                return decode(rest).map(ReadOutcome::Line);
            }

            match self.source.read(&mut self.chunk) {
                Ok(0) => self.eof = true,
                Ok(n) => {
                    let mut fresh = &self.chunk[..n];
                    if std::mem::take(&mut self.skip_lf) && fresh.first() == Some(&b'\n') {
                        fresh = &fresh[1..];
                    }
                    self.buf.extend_from_slice(fresh);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(ReadOutcome::WouldBlock),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ReaderError::Io(e)),
            }
        }
    }

    /// Number of bytes held back waiting for a terminator.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Give back the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }

    fn take_line(&mut self) -> Result<Option<String>, ReaderError> {
        let Some(pos) = self.buf.iter().position(|&b| b == b'\r' || b == b'\n') else {
            return Ok(None);
        };

        let consumed = if self.buf[pos] == b'\r' {
            match self.buf.get(pos + 1) {
                Some(b'\n') => pos + 2,
                Some(_) => pos + 1,
                None => {
                    self.skip_lf = true;
                    pos + 1
                }
            }
        } else {
            pos + 1
        };

        let mut line: Vec<u8> = self.buf.drain(..consumed).collect();
        line.truncate(pos);
        decode(line).map(Some)
    }
}

fn decode(bytes: Vec<u8>) -> Result<String, ReaderError> {
    String::from_utf8(bytes).map_err(|e| ReaderError::Decode {
        valid_up_to: e.utf8_error().valid_up_to(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    enum Step {
        Data(Vec<u8>),
        Block,
        Fail,
    }

    /// Scripted source: replays steps, then reports end of stream.
    struct Script(VecDeque<Step>);

    impl Script {
        fn chunks(data: &[u8], size: usize) -> Self {
            Self(data.chunks(size).map(|c| Step::Data(c.to_vec())).collect())
        }
    }

    impl Read for Script {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                None => Ok(0),
                Some(Step::Block) => Err(io::Error::from(ErrorKind::WouldBlock)),
                Some(Step::Fail) => Err(io::Error::from(ErrorKind::BrokenPipe)),
                Some(Step::Data(d)) => {
                    out[..d.len()].copy_from_slice(&d);
                    Ok(d.len())
                }
            }
        }
    }

    fn drain_lines<R: Read>(reader: &mut LineReader<R>) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            match reader.next_line().unwrap() {
                ReadOutcome::Line(l) => lines.push(l),
                ReadOutcome::WouldBlock => continue,
                ReadOutcome::Eof => return lines,
            }
        }
    }

    #[test]
    fn test_mixed_terminators() {
        let mut reader = LineReader::new(Script::chunks(b"a\nb\rc\r\nd", 64));
        assert_eq!(drain_lines(&mut reader), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_chunking_does_not_change_lines() {
        let inputs: &[&[u8]] = &[
            b"2020;1;2\r\n2020;3;4\r\n",
            b"x\r\r\ny\n\nz\r",
            b"\r\n\r\n\n\r",
            b"one\rtwo\r\nthree\nfour",
            b"trailing-cr\r",
        ];

        for input in inputs {
            let whole = drain_lines(&mut LineReader::new(Script::chunks(input, input.len())));
            for size in 1..=4 {
                let split = drain_lines(&mut LineReader::new(Script::chunks(input, size)));
                assert_eq!(split, whole, "chunk size {size} on {input:?}");
            }
        }
    }

    #[test]
    fn test_crlf_split_across_chunks_counts_once() {
        let script = Script(VecDeque::from(vec![
            Step::Data(b"abc\r".to_vec()),
            Step::Block,
            Step::Data(b"\ndef\n".to_vec()),
        ]));
        let mut reader = LineReader::new(script);

        assert_eq!(reader.next_line().unwrap(), ReadOutcome::Line("abc".into()));
        assert_eq!(reader.next_line().unwrap(), ReadOutcome::WouldBlock);
        assert_eq!(reader.next_line().unwrap(), ReadOutcome::Line("def".into()));
        assert_eq!(reader.next_line().unwrap(), ReadOutcome::Eof);
    }

    #[test]
    fn test_would_block_keeps_partial_line() {
        let script = Script(VecDeque::from(vec![
            Step::Data(b"par".to_vec()),
            Step::Block,
            Step::Data(b"tial\n".to_vec()),
        ]));
        let mut reader = LineReader::new(script);

        assert_eq!(reader.next_line().unwrap(), ReadOutcome::WouldBlock);
        assert_eq!(reader.buffered(), 3);
        assert_eq!(
            reader.next_line().unwrap(),
            ReadOutcome::Line("partial".into())
        );
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn test_eof_flushes_remainder_then_stays_eof() {
        let mut reader = LineReader::new(Script::chunks(b"no-terminator", 5));
        assert_eq!(
            reader.next_line().unwrap(),
            ReadOutcome::Line("no-terminator".into())
        );
        assert_eq!(reader.next_line().unwrap(), ReadOutcome::Eof);
        assert_eq!(reader.next_line().unwrap(), ReadOutcome::Eof);
    }

    #[test]
    fn test_empty_lines_are_reported() {
        let mut reader = LineReader::new(Script::chunks(b"a\n\nb\n", 64));
        assert_eq!(drain_lines(&mut reader), vec!["a", "", "b"]);
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let mut reader = LineReader::new(Script::chunks(b"ok\n\xff\xfe\n", 64));
        assert_eq!(reader.next_line().unwrap(), ReadOutcome::Line("ok".into()));
        match reader.next_line() {
            Err(ReaderError::Decode { valid_up_to }) => assert_eq!(valid_up_to, 0),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_hard_read_error_propagates() {
        let script = Script(VecDeque::from(vec![Step::Fail]));
        let mut reader = LineReader::new(script);
        assert!(matches!(reader.next_line(), Err(ReaderError::Io(_))));
    }
}
