/*
 * base64_line.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Francobollo, an email composition and
 * submission library.
 *
 * Francobollo is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Francobollo is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Francobollo.  If not, see <http://www.gnu.org/licenses/>.
 */

//! CRLF line breaking for base64 body content (RFC 2045 §6.8).
//!
//! Sits below `base64::write::EncoderWriter` and above the output sink:
//! the encoder emits 4-character quanta, the breaker inserts `\r\n` every
//! 76 output characters. 76 is a multiple of 4, so breaks always land on
//! quantum boundaries and no base64 token is ever split.

use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD;
use base64::write::EncoderWriter;

/// Maximum base64 characters per output line.
pub const MAX_BODY_LENGTH: usize = 76;

fn no_output_writer() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "no output writer defined")
}

/// Byte sink that forwards to an inner sink, inserting `\r\n` every
/// [`MAX_BODY_LENGTH`] characters. Close emits a trailing `\r\n` when the
/// last line is non-empty. Writing without an attached sink fails.
pub struct Base64LineWriter<W: Write> {
    inner: Option<W>,
    line_len: usize,
}

impl<W: Write> Base64LineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: Some(inner),
            line_len: 0,
        }
    }

    /// A breaker with no sink attached; every write fails. Exists so the
    /// missing-sink error path is constructible and testable.
    pub fn without_output() -> Self {
        Self {
            inner: None,
            line_len: 0,
        }
    }

    /// Terminate the final line (if non-empty) and return the inner sink.
    pub fn close(mut self) -> io::Result<W> {
        let mut inner = self.inner.take().ok_or_else(no_output_writer)?;
        if self.line_len > 0 {
            inner.write_all(b"\r\n")?;
        }
        inner.flush()?;
        Ok(inner)
    }
}

impl<W: Write> Write for Base64LineWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = self.inner.as_mut().ok_or_else(no_output_writer)?;
        let mut rest = buf;
        while !rest.is_empty() {
            let room = MAX_BODY_LENGTH - self.line_len;
            let n = room.min(rest.len());
            inner.write_all(&rest[..n])?;
            self.line_len += n;
            rest = &rest[n..];
            if self.line_len == MAX_BODY_LENGTH {
                inner.write_all(b"\r\n")?;
                self.line_len = 0;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(inner) => inner.flush(),
            None => Err(no_output_writer()),
        }
    }
}

/// Encode `data` as line-broken base64 into `out`.
pub fn encode_to<W: Write>(data: &[u8], out: W) -> io::Result<W> {
    let mut enc = EncoderWriter::new(Base64LineWriter::new(out), &STANDARD);
    enc.write_all(data)?;
    let breaker = enc.finish()?;
    breaker.close()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn encode(data: &[u8]) -> Vec<u8> {
        encode_to(data, Vec::new()).unwrap()
    }

    fn round_trip(data: &[u8]) {
        let out = encode(data);
        for line in out.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            assert!(line.len() <= MAX_BODY_LENGTH, "line too long: {}", line.len());
        }
        if !out.is_empty() {
            assert!(out.ends_with(b"\r\n"), "missing trailing CRLF");
        }
        let stripped: Vec<u8> = out
            .iter()
            .copied()
            .filter(|&b| b != b'\r' && b != b'\n')
            .collect();
        let decoded = STANDARD.decode(&stripped).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn empty_input_no_output() {
        assert!(encode(b"").is_empty());
    }

    #[test]
    fn short_input_single_line() {
        let out = encode(b"Hello");
        assert_eq!(out, b"SGVsbG8=\r\n");
    }

    #[test]
    fn exact_line_boundary() {
        // 57 input bytes encode to exactly 76 characters.
        let out = encode(&[b'a'; 57]);
        let mut lines = out.split(|&b| b == b'\n');
        let first = lines.next().unwrap();
        assert_eq!(first.strip_suffix(b"\r").unwrap().len(), 76);
    }

    #[test]
    fn boundary_lengths_round_trip() {
        for len in [
            MAX_BODY_LENGTH - 1,
            MAX_BODY_LENGTH,
            MAX_BODY_LENGTH + 1,
            3 * MAX_BODY_LENGTH,
            10 * MAX_BODY_LENGTH,
        ] {
            let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            round_trip(&data);
        }
    }

    #[test]
    fn binary_round_trip() {
        let data: Vec<u8> = (0..=255u8).collect();
        round_trip(&data);
    }

    #[test]
    fn write_without_output_fails() {
        let mut w = Base64LineWriter::<Vec<u8>>::without_output();
        let err = w.write(b"abcd").unwrap_err();
        assert_eq!(err.to_string(), "no output writer defined");
    }
}
