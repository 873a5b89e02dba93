/*
 * rfc2047.rs
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

//! RFC 2047 encoded-words for header values and RFC 5322 header folding.
//!
//! Values containing non-ASCII bytes become `=?charset?Q?..?=` or
//! `=?charset?B?..?=` words; folding keeps header lines at or below 76
//! columns with `\r\n ` continuations, breaking only at whitespace.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::mime::encoding::Charset;

/// Maximum header line length in columns.
pub const MAX_HEADER_LINE: usize = 76;

/// Maximum length of one encoded-word (RFC 2047 §2).
const MAX_ENCODED_WORD: usize = 75;

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// True when the value needs RFC 2047 treatment (non-ASCII or control bytes).
pub fn needs_encoding(s: &str) -> bool {
    s.bytes().any(|b| b >= 0x7F || b < 0x20)
}

/// Q-encoding safe set (RFC 2047 §5 rule 3): letters, digits and a few
/// punctuation characters; everything else is hex-escaped.
fn q_safe(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'!' | b'*' | b'+' | b'-' | b'/')
}

fn q_encoded_len(b: u8) -> usize {
    if q_safe(b) || b == b' ' {
        1
    } else {
        3
    }
}

/// Encode a header value as one or more encoded-words, selecting Q when the
/// value is mostly ASCII and B once non-ASCII characters dominate. Words
/// are split at character boundaries so none exceeds 75 characters;
/// consecutive words are joined with a space (folding whitespace, ignored
/// by decoders between words). ASCII-clean values are returned untouched.
pub fn encode_word(value: &str, charset: Charset) -> String {
    if !needs_encoding(value) {
        return value.to_string();
    }
    let total = value.chars().count();
    let non_ascii = value.chars().filter(|c| !c.is_ascii()).count();
    if non_ascii * 2 > total {
        encode_b(value, charset)
    } else {
        encode_q(value, charset)
    }
}

fn encode_q(value: &str, charset: Charset) -> String {
    let overhead = charset.as_str().len() + 7; // =? ?Q? ?=
    let budget = MAX_ENCODED_WORD - overhead;
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for ch in value.chars() {
        let mut buf = [0u8; 4];
        let bytes = ch.encode_utf8(&mut buf).as_bytes();
        let ch_len: usize = bytes.iter().map(|&b| q_encoded_len(b)).sum();
        if current_len + ch_len > budget && !current.is_empty() {
            words.push(current);
            current = String::new();
            current_len = 0;
        }
        for &b in bytes {
            if b == b' ' {
                current.push('_');
            } else if q_safe(b) {
                current.push(b as char);
            } else {
                current.push('=');
                current.push(HEX_UPPER[(b >> 4) as usize] as char);
                current.push(HEX_UPPER[(b & 15) as usize] as char);
            }
        }
        current_len += ch_len;
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
        .into_iter()
        .map(|w| format!("=?{}?Q?{}?=", charset.as_str(), w))
        .collect::<Vec<_>>()
        .join(" ")
}

fn encode_b(value: &str, charset: Charset) -> String {
    let overhead = charset.as_str().len() + 7; // =? ?B? ?=
    let budget = (MAX_ENCODED_WORD - overhead) / 4 * 3;
    let mut words: Vec<String> = Vec::new();
    let mut chunk = String::new();
    for ch in value.chars() {
        if chunk.len() + ch.len_utf8() > budget && !chunk.is_empty() {
            words.push(STANDARD.encode(chunk.as_bytes()));
            chunk.clear();
        }
        chunk.push(ch);
    }
    if !chunk.is_empty() {
        words.push(STANDARD.encode(chunk.as_bytes()));
    }
    words
        .into_iter()
        .map(|w| format!("=?{}?B?{}?=", charset.as_str(), w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fold a header into wire form: `Name: value\r\n` with continuation lines
/// at or below [`MAX_HEADER_LINE`] columns. Folds only at whitespace; a
/// single token longer than the limit is emitted unbroken. Every fold is
/// `\r\n` followed by a space, never a bare `\r\n`.
pub fn fold_header(name: &str, value: &str) -> String {
    let mut out = String::with_capacity(name.len() + value.len() + 4);
    out.push_str(name);
    out.push(':');
    let mut line_len = name.len() + 1;
    for token in value.split_ascii_whitespace() {
        if line_len + 1 + token.len() > MAX_HEADER_LINE && line_len > name.len() + 1 {
            out.push_str("\r\n ");
            line_len = 1;
        } else {
            out.push(' ');
            line_len += 1;
        }
        out.push_str(token);
        line_len += token.len();
    }
    out.push_str("\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_value_untouched() {
        assert_eq!(encode_word("Hello World", Charset::Utf8), "Hello World");
    }

    #[test]
    fn mostly_ascii_uses_q() {
        let out = encode_word("Grüße", Charset::Utf8);
        assert_eq!(out, "=?UTF-8?Q?Gr=C3=BC=C3=9Fe?=");
    }

    #[test]
    fn mostly_non_ascii_uses_b() {
        let out = encode_word("日本語のテキスト", Charset::Utf8);
        assert!(out.starts_with("=?UTF-8?B?"), "{}", out);
        assert!(out.ends_with("?="));
    }

    #[test]
    fn encoded_words_respect_length_limit() {
        let long = "Übermäßig langer Betreff mit vielen Umlauten äöüß ".repeat(4);
        let out = encode_word(&long, Charset::Utf8);
        for word in out.split(' ') {
            assert!(word.len() <= 75, "word too long: {} ({})", word.len(), word);
        }
    }

    #[test]
    fn fold_short_header_single_line() {
        assert_eq!(fold_header("Subject", "Hello"), "Subject: Hello\r\n");
    }

    #[test]
    fn fold_long_header_continuations() {
        let value = "one two three four five six seven eight nine ten".repeat(3);
        let out = fold_header("X-Long", &value);
        for line in out.split("\r\n").filter(|l| !l.is_empty()) {
            assert!(line.len() <= MAX_HEADER_LINE, "line too long: {}", line.len());
        }
        // Every continuation starts with the folding space.
        for cont in out.split("\r\n").skip(1).filter(|l| !l.is_empty()) {
            assert!(cont.starts_with(' '), "continuation without SP: {:?}", cont);
        }
    }

    #[test]
    fn fold_never_emits_bare_crlf_mid_header() {
        let value = "word ".repeat(40);
        let out = fold_header("X-Many", &value);
        let body = out.strip_suffix("\r\n").unwrap();
        for (i, _) in body.match_indices("\r\n") {
            assert_eq!(&body[i + 2..i + 3], " ");
        }
    }

    #[test]
    fn oversized_token_is_not_split() {
        let token = "a".repeat(120);
        let out = fold_header("X-Big", &token);
        assert_eq!(out, format!("X-Big: {}\r\n", token));
    }
}
