/*
 * encoding.rs
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

//! Content-Transfer-Encoding, charset and content-type tags (RFC 2045).

/// Content transfer encodings supported by the serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// US-ASCII only, no encoding applied.
    SevenBit,
    /// Raw 8-bit body; requires the server to advertise 8BITMIME.
    NoEncoding,
    /// Quoted-printable (RFC 2045 §6.7). Default for text parts.
    #[default]
    QuotedPrintable,
    /// Base64 (RFC 2045 §6.8). Mandatory for attachments and embeds.
    Base64,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::SevenBit => "7bit",
            Encoding::NoEncoding => "8bit",
            Encoding::QuotedPrintable => "quoted-printable",
            Encoding::Base64 => "base64",
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Character set tags for the charset Content-Type parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
    UsAscii,
    Iso88591,
    Iso88592,
    Iso88593,
    Iso88594,
    Iso88595,
    Iso88596,
    Iso88597,
    Iso88599,
    Iso885910,
    Iso885913,
    Iso885914,
    Iso885915,
    Iso885916,
    Windows1250,
    Windows1251,
    Windows1252,
    Windows1255,
    Windows1256,
    Koi8R,
    Koi8U,
    Gb2312,
    Gb18030,
    Big5,
    ShiftJis,
    EucJp,
    /// Escape hatch for charsets not in the closed set.
    Unknown,
}

impl Charset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::UsAscii => "US-ASCII",
            Charset::Iso88591 => "ISO-8859-1",
            Charset::Iso88592 => "ISO-8859-2",
            Charset::Iso88593 => "ISO-8859-3",
            Charset::Iso88594 => "ISO-8859-4",
            Charset::Iso88595 => "ISO-8859-5",
            Charset::Iso88596 => "ISO-8859-6",
            Charset::Iso88597 => "ISO-8859-7",
            Charset::Iso88599 => "ISO-8859-9",
            Charset::Iso885910 => "ISO-8859-10",
            Charset::Iso885913 => "ISO-8859-13",
            Charset::Iso885914 => "ISO-8859-14",
            Charset::Iso885915 => "ISO-8859-15",
            Charset::Iso885916 => "ISO-8859-16",
            Charset::Windows1250 => "windows-1250",
            Charset::Windows1251 => "windows-1251",
            Charset::Windows1252 => "windows-1252",
            Charset::Windows1255 => "windows-1255",
            Charset::Windows1256 => "windows-1256",
            Charset::Koi8R => "KOI8-R",
            Charset::Koi8U => "KOI8-U",
            Charset::Gb2312 => "GB2312",
            Charset::Gb18030 => "GB18030",
            Charset::Big5 => "Big5",
            Charset::ShiftJis => "Shift_JIS",
            Charset::EucJp => "EUC-JP",
            Charset::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content-Type tag. Common types have constants; arbitrary types can be
/// constructed from any string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType(pub(crate) String);

impl ContentType {
    pub const TEXT_PLAIN: &'static str = "text/plain";
    pub const TEXT_HTML: &'static str = "text/html";
    pub const APP_OCTET_STREAM: &'static str = "application/octet-stream";
    pub const MULTIPART_ALTERNATIVE: &'static str = "multipart/alternative";
    pub const MULTIPART_MIXED: &'static str = "multipart/mixed";
    pub const MULTIPART_RELATED: &'static str = "multipart/related";
    pub const PGP_ENCRYPTED: &'static str = "application/pgp-encrypted";
    pub const PGP_SIGNATURE: &'static str = "application/pgp-signature";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn text_plain() -> Self {
        Self::new(Self::TEXT_PLAIN)
    }

    pub fn text_html() -> Self {
        Self::new(Self::TEXT_HTML)
    }

    pub fn octet_stream() -> Self {
        Self::new(Self::APP_OCTET_STREAM)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for text/* types (eligible for a charset parameter).
    pub fn is_text(&self) -> bool {
        self.0.len() >= 5 && self.0[..5].eq_ignore_ascii_case("text/")
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Guess a MIME type from a filename extension. Falls back to
/// application/octet-stream for anything unrecognized.
pub fn content_type_by_extension(filename: &str) -> ContentType {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    let ct = match ext.as_str() {
        "txt" | "text" | "log" => ContentType::TEXT_PLAIN,
        "htm" | "html" => ContentType::TEXT_HTML,
        "css" => "text/css",
        "csv" => "text/csv",
        "ics" => "text/calendar",
        "xml" => "text/xml",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "eml" => "message/rfc822",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => ContentType::APP_OCTET_STREAM,
    };
    ContentType::new(ct)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_wire_forms() {
        assert_eq!(Encoding::SevenBit.as_str(), "7bit");
        assert_eq!(Encoding::NoEncoding.as_str(), "8bit");
        assert_eq!(Encoding::QuotedPrintable.as_str(), "quoted-printable");
        assert_eq!(Encoding::Base64.as_str(), "base64");
        assert_eq!(Encoding::default(), Encoding::QuotedPrintable);
    }

    #[test]
    fn charset_default_is_utf8() {
        assert_eq!(Charset::default().as_str(), "UTF-8");
    }

    #[test]
    fn content_type_is_text() {
        assert!(ContentType::text_plain().is_text());
        assert!(ContentType::text_html().is_text());
        assert!(!ContentType::octet_stream().is_text());
    }

    #[test]
    fn extension_lookup() {
        assert_eq!(content_type_by_extension("notes.txt").as_str(), "text/plain");
        assert_eq!(content_type_by_extension("pixel.png").as_str(), "image/png");
        assert_eq!(content_type_by_extension("archive.ZIP").as_str(), "application/zip");
        assert_eq!(
            content_type_by_extension("blob.weird").as_str(),
            "application/octet-stream"
        );
        assert_eq!(
            content_type_by_extension("noextension").as_str(),
            "application/octet-stream"
        );
    }
}
