/*
 * writer.rs
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

//! Message serializer: emits the header section and the multipart tree to a
//! byte sink, driving the transfer-encoding writers.
//!
//! Emission order is deterministic: general headers sorted lexically,
//! preformatted headers in insertion order, From/To/Cc, then the body tree
//! depth-first with wrappers nested mixed ⊃ related ⊃ alternative. All
//! line endings are CRLF; header lines are folded at 76 columns.

use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD;
use base64::write::EncoderWriter;

use crate::error::Error;
use crate::header::{AddrHeader, Header};
use crate::mime::{
    encode_word, fold_header, needs_encoding, random_boundary, Base64LineWriter, Charset,
    Encoding, QpWriter,
};
use crate::msg::address::Address;
use crate::msg::file::{File, FileRole};
use crate::msg::part::Part;
use crate::msg::{Msg, PgpMode};

/// Serializes a [`Msg`] into a byte sink, counting the bytes written.
pub struct MsgWriter<W: Write> {
    writer: W,
    bytes_written: u64,
}

/// Tracks one open multipart level.
struct Boundary {
    value: String,
    kind: WrapperKind,
    first: bool,
}

#[derive(Clone, Copy, PartialEq)]
enum WrapperKind {
    Mixed,
    Related,
    Alternative,
    PgpEncrypted,
    PgpSigned,
}

impl WrapperKind {
    fn content_type(&self) -> &'static str {
        match self {
            WrapperKind::Mixed => "multipart/mixed",
            WrapperKind::Related => "multipart/related",
            WrapperKind::Alternative => "multipart/alternative",
            WrapperKind::PgpEncrypted => "multipart/encrypted",
            WrapperKind::PgpSigned => "multipart/signed",
        }
    }

    fn protocol(&self) -> Option<&'static str> {
        match self {
            WrapperKind::PgpEncrypted => Some("application/pgp-encrypted"),
            WrapperKind::PgpSigned => Some("application/pgp-signature"),
            _ => None,
        }
    }
}

/// Quote a MIME parameter value unless it is a plain token.
fn param_value(v: &str) -> String {
    let token_safe = !v.is_empty()
        && v.bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    if token_safe {
        v.to_string()
    } else {
        format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

/// Wire form of an address header value, display name RFC 2047-encoded when
/// it carries non-ASCII characters.
fn address_wire(a: &Address, charset: Charset) -> String {
    match a.display_name.as_deref() {
        Some(dn) if !dn.is_empty() && needs_encoding(dn) => {
            format!("{} <{}>", encode_word(dn, charset), a.addr_spec())
        }
        _ => a.to_string(),
    }
}

impl<W: Write> MsgWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            bytes_written: 0,
        }
    }

    /// Bytes emitted so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.writer.write_all(bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Fold and emit one header, RFC 2047-encoding the value when needed.
    fn write_header(&mut self, name: &str, value: &str, charset: Charset) -> Result<(), Error> {
        let encoded;
        let value = if needs_encoding(value) {
            encoded = encode_word(value, charset);
            encoded.as_str()
        } else {
            value
        };
        let folded = fold_header(name, value);
        self.write_raw(folded.as_bytes())
    }

    /// Serialize the whole message. Date, Message-ID, MIME-Version and the
    /// library identification are defaulted onto the Msg first.
    pub fn write_msg(&mut self, msg: &mut Msg) -> Result<(), Error> {
        msg.apply_default_headers();
        let charset = msg.charset();

        // General headers, sorted lexically by wire name.
        let mut gen: Vec<(&'static str, String)> = msg
            .gen_headers()
            .iter()
            .map(|(h, vs)| (h.as_str(), vs.join(", ")))
            .collect();
        gen.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in gen {
            self.write_header(name, &value, charset)?;
        }

        // Preformatted headers, verbatim, in insertion order.
        for (h, v) in msg.preformatted_headers() {
            let line = format!("{}: {}\r\n", h.as_str(), v);
            self.write_raw(line.as_bytes())?;
        }

        // From resolves to the From header, else the envelope sender.
        let from = msg
            .addresses(AddrHeader::From)
            .first()
            .or_else(|| msg.addresses(AddrHeader::EnvelopeFrom).first());
        if let Some(a) = from {
            self.write_header("From", &address_wire(a, charset), charset)?;
        }
        for (name, header) in [
            ("To", AddrHeader::To),
            ("Cc", AddrHeader::Cc),
            ("Reply-To", AddrHeader::ReplyTo),
        ] {
            let addrs = msg.addresses(header);
            if !addrs.is_empty() {
                let value = addrs
                    .iter()
                    .map(|a| address_wire(a, charset))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.write_header(name, &value, charset)?;
            }
        }
        // Bcc is envelope-only and never written.

        let parts = msg.get_parts();
        let embeds = msg.get_embeds();
        let attachments = msg.get_attachments();

        let mut wrappers: Vec<WrapperKind> = Vec::new();
        match msg.pgp_mode() {
            PgpMode::Encrypt => wrappers.push(WrapperKind::PgpEncrypted),
            PgpMode::Sign => wrappers.push(WrapperKind::PgpSigned),
            PgpMode::None => {
                if !attachments.is_empty() {
                    wrappers.push(WrapperKind::Mixed);
                }
                if !embeds.is_empty() {
                    wrappers.push(WrapperKind::Related);
                }
                if parts.len() > 1 {
                    wrappers.push(WrapperKind::Alternative);
                }
            }
        }

        if wrappers.is_empty() {
            return match parts.first() {
                Some(p) => {
                    self.write_part_headers(p)?;
                    self.write_raw(b"\r\n")?;
                    self.write_body(|w| p.write_to(w), p.encoding())
                }
                None => self.write_raw(b"\r\n"),
            };
        }

        // Open the wrapper stack: the outermost Content-Type belongs to the
        // message header section, inner ones each open a part.
        let mut stack: Vec<Boundary> = Vec::new();
        for (i, kind) in wrappers.iter().enumerate() {
            let value = if i == 0 {
                msg.boundary()
                    .map(str::to_string)
                    .unwrap_or_else(random_boundary)
            } else {
                random_boundary()
            };
            if i > 0 {
                self.open_part(stack.last_mut().unwrap())?;
            }
            let mut ct = kind.content_type().to_string();
            if let Some(proto) = kind.protocol() {
                ct.push_str(&format!("; protocol=\"{}\"", proto));
            }
            ct.push_str(&format!("; boundary={}", param_value(&value)));
            self.write_header("Content-Type", &ct, charset)?;
            self.write_raw(b"\r\n")?;
            stack.push(Boundary {
                value,
                kind: *kind,
                first: true,
            });
        }

        // Body parts live in the innermost wrapper.
        let inner = stack.len() - 1;
        for p in &parts {
            self.open_part(&mut stack[inner])?;
            self.write_part_headers(p)?;
            self.write_raw(b"\r\n")?;
            self.write_body(|w| p.write_to(w), p.encoding())?;
        }

        // Unwind: alternative closes first, embeds land in related,
        // attachments in mixed; PGP wrappers take both.
        while let Some(mut b) = stack.pop() {
            match b.kind {
                WrapperKind::Alternative => {}
                WrapperKind::Related => {
                    for f in &embeds {
                        self.open_part(&mut b)?;
                        self.write_file(f, charset)?;
                    }
                }
                WrapperKind::Mixed => {
                    for f in &attachments {
                        self.open_part(&mut b)?;
                        self.write_file(f, charset)?;
                    }
                }
                WrapperKind::PgpEncrypted | WrapperKind::PgpSigned => {
                    for f in &embeds {
                        self.open_part(&mut b)?;
                        self.write_file(f, charset)?;
                    }
                    for f in &attachments {
                        self.open_part(&mut b)?;
                        self.write_file(f, charset)?;
                    }
                }
            }
            self.close_boundary(&b)?;
        }
        Ok(())
    }

    /// Write the dash-boundary line that starts the next part. The CRLF
    /// before the delimiter belongs to the delimiter, not the content.
    fn open_part(&mut self, b: &mut Boundary) -> Result<(), Error> {
        let line = if b.first {
            format!("--{}\r\n", b.value)
        } else {
            format!("\r\n--{}\r\n", b.value)
        };
        b.first = false;
        self.write_raw(line.as_bytes())
    }

    fn close_boundary(&mut self, b: &Boundary) -> Result<(), Error> {
        let line = format!("\r\n--{}--\r\n", b.value);
        self.write_raw(line.as_bytes())
    }

    fn write_part_headers(&mut self, p: &Part) -> Result<(), Error> {
        let ct = format!("{}; charset={}", p.content_type(), p.charset());
        self.write_header(Header::ContentType.as_str(), &ct, p.charset())?;
        if let Some(desc) = p.description() {
            self.write_header(Header::ContentDescription.as_str(), desc, p.charset())?;
        }
        self.write_header(
            Header::ContentTransferEncoding.as_str(),
            p.encoding().as_str(),
            p.charset(),
        )
    }

    /// Emit a file part: MIME header map (pre-populated where absent),
    /// blank line, then the encoded content.
    fn write_file(&mut self, f: &File, charset: Charset) -> Result<(), Error> {
        let filename = if needs_encoding(f.name()) {
            encode_word(f.name(), charset)
        } else {
            f.name().to_string()
        };

        let content_type = match f.header(Header::ContentType) {
            Some(v) => v.to_string(),
            None => format!("{}; name={}", f.content_type(), param_value(&filename)),
        };
        self.write_header(Header::ContentType.as_str(), &content_type, charset)?;

        let disposition = match f.header(Header::ContentDisposition) {
            Some(v) => v.to_string(),
            None => {
                let kind = match f.role() {
                    FileRole::Attachment => "attachment",
                    FileRole::Inline => "inline",
                };
                format!("{}; filename={}", kind, param_value(&filename))
            }
        };
        self.write_header(Header::ContentDisposition.as_str(), &disposition, charset)?;

        if f.role() == FileRole::Inline {
            let cid = match f.header(Header::ContentId) {
                Some(v) => v.to_string(),
                None => format!("<{}>", f.name()),
            };
            self.write_header(Header::ContentId.as_str(), &cid, charset)?;
        }

        if let Some(desc) = f.description() {
            self.write_header(Header::ContentDescription.as_str(), desc, charset)?;
        }
        let cte = f
            .header(Header::ContentTransferEncoding)
            .unwrap_or(f.encoding().as_str());
        self.write_header(Header::ContentTransferEncoding.as_str(), cte, charset)?;

        // Any remaining caller-set MIME headers not covered above.
        for (h, v) in f.headers() {
            if matches!(
                h,
                Header::ContentType
                    | Header::ContentDisposition
                    | Header::ContentId
                    | Header::ContentTransferEncoding
            ) {
                continue;
            }
            self.write_header(h.as_str(), v, charset)?;
        }

        self.write_raw(b"\r\n")?;
        self.write_body(|w| f.write_to(w), f.encoding())
    }

    /// Stream a body producer through the encoder selected by `encoding`.
    fn write_body<F>(&mut self, produce: F, encoding: Encoding) -> Result<(), Error>
    where
        F: Fn(&mut dyn Write) -> io::Result<u64>,
    {
        let Self {
            writer,
            bytes_written,
        } = self;
        let mut sink = CountingWriter {
            inner: writer,
            count: bytes_written,
        };
        match encoding {
            Encoding::QuotedPrintable => {
                let mut qp = QpWriter::new(&mut sink);
                produce(&mut qp).map_err(Error::EncoderWrite)?;
                qp.close().map_err(Error::EncoderClose)?;
            }
            Encoding::Base64 => {
                let breaker = Base64LineWriter::new(&mut sink);
                let mut enc = EncoderWriter::new(breaker, &STANDARD);
                produce(&mut enc).map_err(Error::EncoderWrite)?;
                let breaker = enc.finish().map_err(Error::EncoderClose)?;
                breaker.close().map_err(Error::EncoderClose)?;
            }
            Encoding::SevenBit | Encoding::NoEncoding => {
                produce(&mut sink).map_err(Error::EncoderWrite)?;
            }
        }
        Ok(())
    }
}

struct CountingWriter<'a, W: Write> {
    inner: &'a mut W,
    count: &'a mut u64,
}

impl<W: Write> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        *self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::ContentType;
    use base64::Engine;

    fn render(msg: &mut Msg) -> String {
        let mut out = Vec::new();
        let mut mw = MsgWriter::new(&mut out);
        mw.write_msg(msg).unwrap();
        let n = mw.bytes_written();
        assert_eq!(n as usize, out.len());
        String::from_utf8(out).unwrap()
    }

    fn simple_msg() -> Msg {
        let mut m = Msg::new();
        m.from("\"Toni Tester\" <tester@domain.tld>").unwrap();
        m.to(&["<rcpt@domain.tld>"]).unwrap();
        m.subject("Hello");
        m.set_body_string(ContentType::text_plain(), "Test");
        m
    }

    #[test]
    fn simple_message_headers_and_body() {
        let mut m = simple_msg();
        let out = render(&mut m);
        assert!(out.contains("From: \"Toni Tester\" <tester@domain.tld>\r\n"), "{}", out);
        assert!(out.contains("To: <rcpt@domain.tld>\r\n"));
        assert!(out.contains("Subject: Hello\r\n"));
        assert!(out.contains("MIME-Version: 1.0\r\n"));
        assert!(out.contains("Content-Type: text/plain; charset=UTF-8\r\n"));
        assert!(out.contains("Content-Transfer-Encoding: quoted-printable\r\n"));
        assert!(out.contains("\r\n\r\nTest"), "body not after blank line: {}", out);
    }

    #[test]
    fn date_and_message_id_defaulted() {
        let mut m = simple_msg();
        let out = render(&mut m);
        assert!(out.contains("Date: "));
        let mid_line = out
            .lines()
            .find(|l| l.starts_with("Message-ID: "))
            .expect("Message-ID header");
        let id = mid_line.trim_start_matches("Message-ID: ");
        assert!(id.starts_with('<') && id.contains('@') && id.ends_with('>'), "{}", id);
    }

    #[test]
    fn bcc_never_written() {
        let mut m = simple_msg();
        m.bcc(&["secret@domain.tld"]).unwrap();
        let out = render(&mut m);
        assert!(!out.contains("secret@domain.tld"));
        assert!(!out.contains("Bcc"));
    }

    #[test]
    fn no_from_header_omitted_envelope_fallback() {
        let mut m = Msg::new();
        m.envelope_from("env@domain.tld").unwrap();
        m.to(&["rcpt@domain.tld"]).unwrap();
        m.set_body_string(ContentType::text_plain(), "x");
        let out = render(&mut m);
        assert!(out.contains("From: <env@domain.tld>\r\n"));
    }

    #[test]
    fn header_lines_stay_within_limit() {
        let mut m = simple_msg();
        // Pin the Message-ID so the check is independent of the local
        // hostname length.
        m.set_message_id_with_value("fixed@test.local");
        m.subject("word ".repeat(40));
        let out = render(&mut m);
        let header_section = out.split("\r\n\r\n").next().unwrap();
        for line in header_section.split("\r\n") {
            assert!(line.len() <= 76, "header line too long: {:?}", line);
        }
    }

    #[test]
    fn non_ascii_subject_is_encoded() {
        let mut m = simple_msg();
        m.subject("Grüße");
        let out = render(&mut m);
        assert!(out.contains("Subject: =?UTF-8?Q?Gr=C3=BC=C3=9Fe?=\r\n"), "{}", out);
    }

    #[test]
    fn general_headers_sorted_lexically() {
        let mut m = simple_msg();
        m.set_gen_header(Header::Organization, vec!["ACME"]);
        let out = render(&mut m);
        let names: Vec<&str> = out
            .split("\r\n\r\n")
            .next()
            .unwrap()
            .split("\r\n")
            .filter(|l| !l.starts_with(' '))
            .filter_map(|l| l.split(':').next())
            .collect();
        let from_pos = names.iter().position(|n| *n == "From").unwrap();
        let gen_names: Vec<&&str> = names[..from_pos].iter().collect();
        let mut sorted = gen_names.clone();
        sorted.sort();
        assert_eq!(gen_names, sorted, "general headers not sorted: {:?}", names);
    }

    #[test]
    fn preformatted_after_general_before_from() {
        let mut m = simple_msg();
        m.set_preformatted_header(Header::References, "<a@x> <b@x>");
        let out = render(&mut m);
        let refs = out.find("References: <a@x> <b@x>\r\n").unwrap();
        let from = out.find("From: ").unwrap();
        let subject = out.find("Subject: ").unwrap();
        assert!(subject < refs && refs < from);
    }

    #[test]
    fn attachment_forces_multipart_mixed() {
        let mut m = simple_msg();
        let data: Vec<u8> = (0..48u8).collect();
        m.attach_reader("test.txt", &data[..]).unwrap();
        let out = render(&mut m);
        assert!(out.contains("Content-Type: multipart/mixed; boundary="), "{}", out);
        assert!(out.contains("Content-Disposition: attachment; filename=test.txt\r\n"));
        assert!(out.contains("Content-Transfer-Encoding: base64\r\n"));

        // The base64 payload round-trips to the original bytes.
        let marker = "Content-Transfer-Encoding: base64\r\n\r\n";
        let start = out.find(marker).unwrap() + marker.len();
        let rest = &out[start..];
        let end = rest.find("\r\n--").unwrap();
        let stripped: String = rest[..end].chars().filter(|c| *c != '\r' && *c != '\n').collect();
        let decoded = base64::engine::general_purpose::STANDARD.decode(stripped).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn embed_forces_multipart_related_with_cid() {
        let mut m = simple_msg();
        m.embed_reader("pixel.png", &[0x89u8, 0x50, 0x4E, 0x47][..]).unwrap();
        let out = render(&mut m);
        assert!(out.contains("Content-Type: multipart/related; boundary="), "{}", out);
        assert!(out.contains("Content-Disposition: inline; filename=pixel.png\r\n"));
        assert!(out.contains("Content-ID: <pixel.png>\r\n"));
        assert!(!out.contains("multipart/mixed"));
    }

    #[test]
    fn two_parts_force_multipart_alternative() {
        let mut m = simple_msg();
        m.add_alternative_string(ContentType::text_html(), "<p>Test</p>");
        let out = render(&mut m);
        // The boundary parameter lands on a folded continuation line.
        assert!(out.contains("Content-Type: multipart/alternative;"));
        assert!(out.contains("boundary="));
        assert!(out.contains("Content-Type: text/plain; charset=UTF-8"));
        assert!(out.contains("Content-Type: text/html; charset=UTF-8"));
    }

    #[test]
    fn full_nesting_mixed_related_alternative() {
        let mut m = simple_msg();
        m.add_alternative_string(ContentType::text_html(), "<p>Test</p>");
        m.embed_reader("pixel.png", &[1u8, 2, 3][..]).unwrap();
        m.attach_reader("test.txt", &b"data"[..]).unwrap();
        let out = render(&mut m);
        let mixed = out.find("multipart/mixed").unwrap();
        let related = out.find("multipart/related").unwrap();
        let alternative = out.find("multipart/alternative").unwrap();
        assert!(mixed < related && related < alternative);
        // Terminators close inner before outer.
        let boundary_of = |kind: &str| {
            let pos = out.find(kind).unwrap();
            let tail = &out[pos..];
            let b = tail.split("boundary=").nth(1).unwrap();
            b.split(|c: char| c == '\r' || c == ';').next().unwrap().to_string()
        };
        let b_mixed = boundary_of("multipart/mixed");
        let b_alt = boundary_of("multipart/alternative");
        let alt_end = out.find(&format!("--{}--", b_alt)).unwrap();
        let mixed_end = out.find(&format!("--{}--", b_mixed)).unwrap();
        assert!(alt_end < mixed_end);
    }

    #[test]
    fn caller_boundary_seeds_outer_multipart() {
        let mut m = simple_msg();
        m.set_boundary("my-fixed-boundary").unwrap();
        m.attach_reader("a.txt", &b"x"[..]).unwrap();
        let out = render(&mut m);
        assert!(out.contains("boundary=my-fixed-boundary"));
        assert!(out.contains("--my-fixed-boundary\r\n"));
        assert!(out.contains("--my-fixed-boundary--"));
    }

    #[test]
    fn deleted_part_skipped_entirely() {
        let mut m = simple_msg();
        m.add_alternative_string(ContentType::text_html(), "<p>gone</p>");
        m.parts_mut()[1].delete();
        let out = render(&mut m);
        assert!(!out.contains("text/html"));
        assert!(!out.contains("multipart/alternative"));
    }

    #[test]
    fn empty_part_still_gets_headers() {
        let mut m = Msg::new();
        m.from("a@x.tld").unwrap();
        m.to(&["b@x.tld"]).unwrap();
        m.set_body_string(ContentType::text_plain(), "");
        let out = render(&mut m);
        assert!(out.contains("Content-Type: text/plain; charset=UTF-8\r\n"));
        assert!(out.ends_with("\r\n"));
    }

    #[test]
    fn pgp_mode_overrides_structure() {
        let mut m = simple_msg();
        m.set_pgp_mode(PgpMode::Encrypt);
        let out = render(&mut m);
        assert!(out.contains("multipart/encrypted"));
        assert!(out.contains("protocol=\"application/pgp-encrypted\""));
        let mut s = simple_msg();
        s.set_pgp_mode(PgpMode::Sign);
        let out = render(&mut s);
        assert!(out.contains("multipart/signed"));
        assert!(out.contains("protocol=\"application/pgp-signature\""));
    }

    #[test]
    fn crlf_discipline_no_bare_lf() {
        let mut m = simple_msg();
        m.attach_reader("test.txt", &b"with\nbare\nnewlines"[..]).unwrap();
        let out = render(&mut m);
        let bytes = out.as_bytes();
        for (i, &b) in bytes.iter().enumerate() {
            if b == b'\n' {
                assert!(i > 0 && bytes[i - 1] == b'\r', "bare LF at {}", i);
            }
        }
    }

    #[test]
    fn eight_bit_body_written_raw() {
        let mut m = Msg::new();
        m.set_encoding(Encoding::NoEncoding);
        m.from("a@x.tld").unwrap();
        m.to(&["b@x.tld"]).unwrap();
        m.set_body_string(ContentType::text_plain(), "rohe Bytes: äöü");
        let out = render(&mut m);
        assert!(out.contains("Content-Transfer-Encoding: 8bit\r\n"));
        assert!(out.contains("rohe Bytes: äöü"));
    }
}
