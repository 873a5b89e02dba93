/*
 * dot_stuffer.rs
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

//! Transparency encoding for SMTP DATA (RFC 5321 §4.5.2).
//!
//! A `.` that opens a line must be doubled so the receiver cannot mistake
//! it for the end-of-data mark, and the stream is closed with `CRLF . CRLF`.
//! Instead of a per-byte state machine this scans each chunk for dots and
//! consults a two-byte lookbehind window, which also covers CRLF pairs and
//! dots split across chunk boundaries.

/// Streaming transparency encoder. Feed chunks through [`stuff_into`],
/// then seal the stream with [`finish_into`].
///
/// [`stuff_into`]: DotStuffer::stuff_into
/// [`finish_into`]: DotStuffer::finish_into
pub struct DotStuffer {
    /// The two most recent bytes of the stream. Seeded with CRLF so a dot
    /// at the very start of the message counts as line-opening.
    window: [u8; 2],
    fed: bool,
}

impl Default for DotStuffer {
    fn default() -> Self {
        Self {
            window: *b"\r\n",
            fed: false,
        }
    }
}

impl DotStuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A line opens only after a full CRLF pair; a lone LF does not count.
    fn opens_line(&self, chunk: &[u8], dot: usize) -> bool {
        let before = match dot {
            0 => self.window,
            1 => [self.window[1], chunk[0]],
            _ => [chunk[dot - 2], chunk[dot - 1]],
        };
        before == *b"\r\n"
    }

    /// Append `chunk` to `out`, doubling every line-opening dot. All other
    /// bytes pass through untouched and in order.
    pub fn stuff_into(&mut self, chunk: &[u8], out: &mut Vec<u8>) {
        let mut copied = 0;
        for (idx, &byte) in chunk.iter().enumerate() {
            if byte == b'.' && self.opens_line(chunk, idx) {
                out.extend_from_slice(&chunk[copied..idx]);
                out.extend_from_slice(b"..");
                copied = idx + 1;
            }
        }
        out.extend_from_slice(&chunk[copied..]);
        match chunk {
            [] => {}
            [only] => {
                self.window = [self.window[1], *only];
                self.fed = true;
            }
            [.., a, b] => {
                self.window = [*a, *b];
                self.fed = true;
            }
        }
    }

    /// Append the end-of-data mark. Content that does not already end on a
    /// complete CRLF gets one first (a dangling CR only needs the LF).
    pub fn finish_into(&mut self, out: &mut Vec<u8>) {
        if self.fed && self.window == *b"\r\n" {
            out.extend_from_slice(b".\r\n");
        } else if self.fed && self.window[1] == b'\r' {
            out.extend_from_slice(b"\n.\r\n");
        } else {
            out.extend_from_slice(b"\r\n.\r\n");
        }
        self.reset();
    }

    pub fn reset(&mut self) {
        self.window = *b"\r\n";
        self.fed = false;
    }
}
