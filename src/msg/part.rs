/*
 * part.rs
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

//! A message body leaf: content type, charset, transfer encoding and a
//! producer that writes the raw (unencoded) bytes on demand.

use std::io::{self, Write};
use std::sync::Arc;

use crate::mime::{Charset, ContentType, Encoding};

/// Body producer: writes raw bytes into the sink, returns the byte count.
/// Shared so a message can be serialized more than once.
pub type WriteFunc = Arc<dyn Fn(&mut dyn Write) -> io::Result<u64> + Send + Sync>;

/// Wrap a byte buffer as a [`WriteFunc`].
pub fn write_func_from_bytes(data: impl Into<Vec<u8>>) -> WriteFunc {
    let data: Vec<u8> = data.into();
    Arc::new(move |w: &mut dyn Write| {
        w.write_all(&data)?;
        Ok(data.len() as u64)
    })
}

/// One body part of a message.
#[derive(Clone)]
pub struct Part {
    content_type: ContentType,
    charset: Charset,
    encoding: Encoding,
    description: Option<String>,
    write_func: WriteFunc,
    deleted: bool,
    smime_signed: bool,
}

impl Part {
    /// New part with string content. Charset and encoding default to the
    /// message-level values when added through the Msg body operations.
    pub fn new(content_type: ContentType, content: impl Into<Vec<u8>>) -> Self {
        Self::from_writer(content_type, write_func_from_bytes(content))
    }

    pub fn from_writer(content_type: ContentType, write_func: WriteFunc) -> Self {
        Self {
            content_type,
            charset: Charset::default(),
            encoding: Encoding::default(),
            description: None,
            write_func,
            deleted: false,
            smime_signed: false,
        }
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn set_content_type(&mut self, content_type: ContentType) -> &mut Self {
        self.content_type = content_type;
        self
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn set_charset(&mut self, charset: Charset) -> &mut Self {
        self.charset = charset;
        self
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn set_encoding(&mut self, encoding: Encoding) -> &mut Self {
        self.encoding = encoding;
        self
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the body with static content.
    pub fn set_content(&mut self, content: impl Into<Vec<u8>>) -> &mut Self {
        self.write_func = write_func_from_bytes(content);
        self
    }

    pub fn set_write_func(&mut self, write_func: WriteFunc) -> &mut Self {
        self.write_func = write_func;
        self
    }

    /// Run the producer into a buffer and return the raw content.
    pub fn get_content(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        (self.write_func)(&mut buf)?;
        Ok(buf)
    }

    /// Mark this part as deleted; the serializer skips it.
    pub fn delete(&mut self) {
        self.deleted = true;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn set_smime_signing(&mut self, sign: bool) -> &mut Self {
        self.smime_signed = sign;
        self
    }

    pub fn is_smime_signed(&self) -> bool {
        self.smime_signed
    }

    pub(crate) fn write_to(&self, w: &mut dyn Write) -> io::Result<u64> {
        (self.write_func)(w)
    }
}

impl std::fmt::Debug for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Part")
            .field("content_type", &self.content_type)
            .field("charset", &self.charset)
            .field("encoding", &self.encoding)
            .field("description", &self.description)
            .field("deleted", &self.deleted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_round_trip() {
        let p = Part::new(ContentType::text_plain(), "Test");
        assert_eq!(p.get_content().unwrap(), b"Test");
    }

    #[test]
    fn writer_part_produces_content() {
        let p = Part::from_writer(
            ContentType::text_html(),
            Arc::new(|w: &mut dyn Write| {
                w.write_all(b"<p>hi</p>")?;
                Ok(9)
            }),
        );
        assert_eq!(p.get_content().unwrap(), b"<p>hi</p>");
    }

    #[test]
    fn setters_mutate_in_place() {
        let mut p = Part::new(ContentType::text_plain(), "x");
        p.set_charset(Charset::Iso88591)
            .set_encoding(Encoding::Base64)
            .set_description("desc");
        assert_eq!(p.charset(), Charset::Iso88591);
        assert_eq!(p.encoding(), Encoding::Base64);
        assert_eq!(p.description(), Some("desc"));
        assert!(!p.is_deleted());
        p.delete();
        assert!(p.is_deleted());
    }

    #[test]
    fn empty_part_yields_zero_bytes() {
        let p = Part::new(ContentType::text_plain(), Vec::new());
        assert!(p.get_content().unwrap().is_empty());
    }
}
