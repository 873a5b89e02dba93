/*
 * file.rs
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

//! Attachments and inline embeds: filename, MIME headers and a content
//! producer. Transfer encoding is base64; a quoted-printable request is
//! promoted silently.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::header::Header;
use crate::mime::{content_type_by_extension, ContentType, Encoding};
use crate::msg::part::{write_func_from_bytes, WriteFunc};

/// How the file is presented to the receiving client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Attachment,
    Inline,
}

/// An attachment or embedded file.
#[derive(Clone)]
pub struct File {
    name: String,
    content_type: ContentType,
    description: Option<String>,
    encoding: Encoding,
    headers: Vec<(Header, String)>,
    write_func: WriteFunc,
    role: FileRole,
    deleted: bool,
}

impl File {
    /// File from a filesystem path. The content is read at serialize time.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path: PathBuf = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let content_type = content_type_by_extension(&name);
        let write_path = path.clone();
        let write_func: WriteFunc = Arc::new(move |w: &mut dyn Write| {
            let mut f = std::fs::File::open(&write_path)?;
            io::copy(&mut f, w)
        });
        Self::build(name, content_type, write_func)
    }

    /// File from any readable source; the reader is drained once, up front.
    pub fn from_reader(name: impl Into<String>, mut reader: impl Read) -> io::Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::from_bytes(name, data))
    }

    pub fn from_bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        let content_type = content_type_by_extension(&name);
        Self::build(name, content_type, write_func_from_bytes(data))
    }

    fn build(name: String, content_type: ContentType, write_func: WriteFunc) -> Self {
        Self {
            name,
            content_type,
            description: None,
            encoding: Encoding::Base64,
            headers: Vec::new(),
            write_func,
            role: FileRole::Attachment,
            deleted: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_file_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn set_content_type(&mut self, content_type: ContentType) -> &mut Self {
        self.content_type = content_type;
        self
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Set the transfer encoding. Quoted-printable is promoted to base64;
    /// file content must survive binary-safe.
    pub fn set_encoding(&mut self, encoding: Encoding) -> &mut Self {
        self.encoding = match encoding {
            Encoding::QuotedPrintable => Encoding::Base64,
            other => other,
        };
        self
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Set the Content-ID MIME header (angle brackets added if missing).
    pub fn set_content_id(&mut self, cid: impl Into<String>) -> &mut Self {
        let cid = cid.into();
        let value = if cid.starts_with('<') {
            cid
        } else {
            format!("<{}>", cid)
        };
        self.set_header(Header::ContentId, value);
        self
    }

    /// Set or replace an entry in the file's MIME header map.
    pub fn set_header(&mut self, header: Header, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        if let Some(slot) = self.headers.iter_mut().find(|(h, _)| *h == header) {
            slot.1 = value;
        } else {
            self.headers.push((header, value));
        }
        self
    }

    pub fn header(&self, header: Header) -> Option<&str> {
        self.headers
            .iter()
            .find(|(h, _)| *h == header)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn headers(&self) -> &[(Header, String)] {
        &self.headers
    }

    pub fn role(&self) -> FileRole {
        self.role
    }

    pub(crate) fn set_role(&mut self, role: FileRole) {
        self.role = role;
    }

    pub fn delete(&mut self) {
        self.deleted = true;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn get_content(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        (self.write_func)(&mut buf)?;
        Ok(buf)
    }

    pub(crate) fn write_to(&self, w: &mut dyn Write) -> io::Result<u64> {
        (self.write_func)(w)
    }

    // Consuming builder variants for construction-time options.

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.set_file_name(name);
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.set_content_type(content_type);
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.set_encoding(encoding);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.set_description(description);
        self
    }

    pub fn with_content_id(mut self, cid: impl Into<String>) -> Self {
        self.set_content_id(cid);
        self
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("encoding", &self.encoding)
            .field("role", &self.role)
            .field("deleted", &self.deleted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_file_defaults() {
        let f = File::from_reader("test.txt", &b"hello"[..]).unwrap();
        assert_eq!(f.name(), "test.txt");
        assert_eq!(f.content_type().as_str(), "text/plain");
        assert_eq!(f.encoding(), Encoding::Base64);
        assert_eq!(f.get_content().unwrap(), b"hello");
    }

    #[test]
    fn unknown_extension_falls_back_to_octet_stream() {
        let f = File::from_bytes("data.bin2", vec![1, 2, 3]);
        assert_eq!(f.content_type().as_str(), "application/octet-stream");
    }

    #[test]
    fn quoted_printable_promoted_to_base64() {
        let f = File::from_bytes("a.txt", b"x".to_vec()).with_encoding(Encoding::QuotedPrintable);
        assert_eq!(f.encoding(), Encoding::Base64);
    }

    #[test]
    fn content_id_gets_angle_brackets() {
        let mut f = File::from_bytes("pixel.png", vec![0]);
        f.set_content_id("pixel.png");
        assert_eq!(f.header(Header::ContentId), Some("<pixel.png>"));
        f.set_content_id("<other>");
        assert_eq!(f.header(Header::ContentId), Some("<other>"));
    }

    #[test]
    fn header_map_replaces_on_set() {
        let mut f = File::from_bytes("a", vec![]);
        f.set_header(Header::ContentDescription, "one");
        f.set_header(Header::ContentDescription, "two");
        assert_eq!(f.header(Header::ContentDescription), Some("two"));
        assert_eq!(f.headers().len(), 1);
    }
}
