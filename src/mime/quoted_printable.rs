/*
 * quoted_printable.rs
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

//! Quoted-printable encoder/decoder for Content-Transfer-Encoding (RFC 2045 §6.7).
//!
//! The encoder is a scoped writer: soft line breaks keep every output line
//! at or below 76 characters, CRLF pairs pass through as hard breaks, lone
//! CR or LF and trailing whitespace are escaped so a decode restores the
//! input byte-for-byte. `close` must be called to flush pending state.

use std::io::{self, Write};

/// Maximum output line length including a trailing soft-break `=`.
const MAX_LINE: usize = 76;

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

const HEX_DECODE: [i8; 256] = {
    let mut t = [-1i8; 256];
    let mut i = 0u8;
    while i < 10 {
        t[(b'0' + i) as usize] = i as i8;
        i += 1;
    }
    let mut i = 0u8;
    while i < 6 {
        t[(b'A' + i) as usize] = (10 + i) as i8;
        t[(b'a' + i) as usize] = (10 + i) as i8;
        i += 1;
    }
    t
};

/// Streaming quoted-printable encoder over any byte sink.
pub struct QpWriter<W: Write> {
    inner: W,
    line_len: usize,
    /// Trailing space or tab held back until the next byte decides whether
    /// it sits at a line end (then it must be escaped).
    pending_ws: Option<u8>,
    pending_cr: bool,
}

impl<W: Write> QpWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            line_len: 0,
            pending_ws: None,
            pending_cr: false,
        }
    }

    /// Emit output characters, soft-breaking first if they would push the
    /// line past the limit (one column is reserved for the `=`).
    fn emit(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.line_len + bytes.len() > MAX_LINE - 1 {
            self.inner.write_all(b"=\r\n")?;
            self.line_len = 0;
        }
        self.inner.write_all(bytes)?;
        self.line_len += bytes.len();
        Ok(())
    }

    fn emit_encoded(&mut self, b: u8) -> io::Result<()> {
        let enc = [b'=', HEX_UPPER[(b >> 4) as usize], HEX_UPPER[(b & 15) as usize]];
        self.emit(&enc)
    }

    fn flush_ws_literal(&mut self) -> io::Result<()> {
        if let Some(ws) = self.pending_ws.take() {
            self.emit(&[ws])?;
        }
        Ok(())
    }

    fn flush_ws_encoded(&mut self) -> io::Result<()> {
        if let Some(ws) = self.pending_ws.take() {
            self.emit_encoded(ws)?;
        }
        Ok(())
    }

    fn push_byte(&mut self, b: u8) -> io::Result<()> {
        if self.pending_cr {
            self.pending_cr = false;
            if b == b'\n' {
                // Whitespace before a hard break must be escaped.
                self.flush_ws_encoded()?;
                self.inner.write_all(b"\r\n")?;
                self.line_len = 0;
                return Ok(());
            }
            self.emit_encoded(b'\r')?;
        }
        match b {
            b'\r' => self.pending_cr = true,
            b'\n' => {
                self.flush_ws_literal()?;
                self.emit_encoded(b'\n')?;
            }
            b' ' | b'\t' => {
                self.flush_ws_literal()?;
                self.pending_ws = Some(b);
            }
            33..=60 | 62..=126 => {
                self.flush_ws_literal()?;
                self.emit(&[b])?;
            }
            _ => {
                self.flush_ws_literal()?;
                self.emit_encoded(b)?;
            }
        }
        Ok(())
    }

    /// Flush pending state and return the inner writer.
    pub fn close(mut self) -> io::Result<W> {
        if self.pending_cr {
            self.pending_cr = false;
            self.emit_encoded(b'\r')?;
        }
        self.flush_ws_encoded()?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for QpWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &b in buf {
            self.push_byte(b)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Decode quoted-printable text. Handles =XX escapes and soft line breaks
/// (=CRLF and =LF); malformed escapes pass through literally.
pub fn decode(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len());
    let mut pos = 0;
    while pos < src.len() {
        let b = src[pos];
        if b != b'=' {
            out.push(b);
            pos += 1;
            continue;
        }
        match &src[pos + 1..] {
            [h1, h2, ..] if HEX_DECODE[*h1 as usize] >= 0 && HEX_DECODE[*h2 as usize] >= 0 => {
                out.push(((HEX_DECODE[*h1 as usize] << 4) | HEX_DECODE[*h2 as usize]) as u8);
                pos += 3;
            }
            [b'\r', b'\n', ..] => pos += 3,
            [b'\n', ..] => pos += 2,
            _ => {
                out.push(b);
                pos += 1;
            }
        }
    }
    out
}
