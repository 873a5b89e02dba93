/*
 * mod.rs
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

//! The message model: ordered parts, attachments and embeds under typed
//! headers, plus the MIME structure decisions made at serialize time.

pub mod address;
pub mod file;
pub mod part;
pub mod writer;

pub use address::Address;
pub use file::{File, FileRole};
pub use part::{Part, WriteFunc};
pub use writer::MsgWriter;

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Local, Utc};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

use crate::error::{Error, SendError};
use crate::header::{AddrHeader, Header, Importance};
use crate::mime::{is_valid_boundary, Charset, ContentType, Encoding};

/// Default User-Agent / X-Mailer identification.
const USER_AGENT: &str = "francobollo v0.1.0";

/// RFC 1123 date with numeric zone, e.g. `Mon, 02 Jan 2006 15:04:05 -0700`.
const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// PGP framing for the top-level content type (RFC 3156). Payload handling
/// is left to middleware; only the multipart structure changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PgpMode {
    #[default]
    None,
    Encrypt,
    Sign,
}

/// An email message under construction.
///
/// Not safe for concurrent mutation; build it on one thread, then hand it
/// to a [`Client`](crate::client::Client) for submission or serialize it
/// with [`write_to`](Msg::write_to).
#[derive(Debug, Clone, Default)]
pub struct Msg {
    charset: Charset,
    encoding: Encoding,
    mime_version: Option<String>,
    gen_headers: HashMap<Header, Vec<String>>,
    preformatted: Vec<(Header, String)>,
    addr_headers: HashMap<AddrHeader, Vec<Address>>,
    parts: Vec<Part>,
    attachments: Vec<File>,
    embeds: Vec<File>,
    boundary: Option<String>,
    pgp_mode: PgpMode,
    no_default_user_agent: bool,
    send_error: Option<SendError>,
    delivered: bool,
}

impl Msg {
    pub fn new() -> Self {
        Self::default()
    }

    // --- charset / encoding / MIME version ---

    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Default charset for parts added after this call.
    pub fn set_charset(&mut self, charset: Charset) -> &mut Self {
        self.charset = charset;
        self
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Default transfer encoding for parts added after this call.
    pub fn set_encoding(&mut self, encoding: Encoding) -> &mut Self {
        self.encoding = encoding;
        self
    }

    pub fn mime_version(&self) -> &str {
        self.mime_version.as_deref().unwrap_or("1.0")
    }

    pub fn set_mime_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.mime_version = Some(version.into());
        self
    }

    // --- address headers ---

    fn set_addr_header<S: AsRef<str>>(
        &mut self,
        header: AddrHeader,
        addrs: &[S],
    ) -> Result<(), Error> {
        let mut parsed = Vec::with_capacity(addrs.len());
        for a in addrs {
            parsed.push(Address::parse(a.as_ref())?);
        }
        self.addr_headers.insert(header, parsed);
        Ok(())
    }

    fn add_addr_header(&mut self, header: AddrHeader, addr: &str) -> Result<(), Error> {
        let parsed = Address::parse(addr)?;
        self.addr_headers.entry(header).or_default().push(parsed);
        Ok(())
    }

    /// Set the From header to exactly one address.
    pub fn from(&mut self, addr: &str) -> Result<(), Error> {
        self.set_addr_header(AddrHeader::From, &[addr])
    }

    /// Set the envelope sender used for MAIL FROM; never written into the
    /// message header section.
    pub fn envelope_from(&mut self, addr: &str) -> Result<(), Error> {
        self.set_addr_header(AddrHeader::EnvelopeFrom, &[addr])
    }

    pub fn to<S: AsRef<str>>(&mut self, addrs: &[S]) -> Result<(), Error> {
        self.set_addr_header(AddrHeader::To, addrs)
    }

    pub fn add_to(&mut self, addr: &str) -> Result<(), Error> {
        self.add_addr_header(AddrHeader::To, addr)
    }

    /// Keep the parsable subset, silently dropping invalid entries.
    pub fn to_ignore_invalid<S: AsRef<str>>(&mut self, addrs: &[S]) {
        self.addr_headers
            .insert(AddrHeader::To, Address::parse_ignore_invalid(addrs));
    }

    pub fn cc<S: AsRef<str>>(&mut self, addrs: &[S]) -> Result<(), Error> {
        self.set_addr_header(AddrHeader::Cc, addrs)
    }

    pub fn add_cc(&mut self, addr: &str) -> Result<(), Error> {
        self.add_addr_header(AddrHeader::Cc, addr)
    }

    pub fn cc_ignore_invalid<S: AsRef<str>>(&mut self, addrs: &[S]) {
        self.addr_headers
            .insert(AddrHeader::Cc, Address::parse_ignore_invalid(addrs));
    }

    pub fn bcc<S: AsRef<str>>(&mut self, addrs: &[S]) -> Result<(), Error> {
        self.set_addr_header(AddrHeader::Bcc, addrs)
    }

    pub fn add_bcc(&mut self, addr: &str) -> Result<(), Error> {
        self.add_addr_header(AddrHeader::Bcc, addr)
    }

    pub fn bcc_ignore_invalid<S: AsRef<str>>(&mut self, addrs: &[S]) {
        self.addr_headers
            .insert(AddrHeader::Bcc, Address::parse_ignore_invalid(addrs));
    }

    pub fn reply_to(&mut self, addr: &str) -> Result<(), Error> {
        self.set_addr_header(AddrHeader::ReplyTo, &[addr])
    }

    pub fn addresses(&self, header: AddrHeader) -> &[Address] {
        self.addr_headers
            .get(&header)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Envelope sender: envelope From when set (and wanted), else From.
    pub fn get_sender(&self, use_env_from: bool) -> Result<String, Error> {
        if use_env_from {
            if let Some(a) = self.addresses(AddrHeader::EnvelopeFrom).first() {
                return Ok(a.addr_spec());
            }
        }
        self.addresses(AddrHeader::From)
            .first()
            .map(|a| a.addr_spec())
            .ok_or(Error::NoFromAddress)
    }

    /// Envelope recipients: To ∪ Cc ∪ Bcc, deduplicated, order preserved.
    pub fn get_recipients(&self) -> Result<Vec<String>, Error> {
        let mut out: Vec<String> = Vec::new();
        for header in [AddrHeader::To, AddrHeader::Cc, AddrHeader::Bcc] {
            for a in self.addresses(header) {
                let spec = a.addr_spec();
                if !out.contains(&spec) {
                    out.push(spec);
                }
            }
        }
        if out.is_empty() {
            return Err(Error::NoRcptAddresses);
        }
        Ok(out)
    }

    // --- general headers ---

    /// Set a general header, replacing previous values.
    pub fn set_gen_header<S: Into<String>>(&mut self, header: Header, values: Vec<S>) -> &mut Self {
        self.gen_headers
            .insert(header, values.into_iter().map(|v| v.into()).collect());
        self
    }

    /// Set a preformatted header: written verbatim, no encoding or folding.
    pub fn set_preformatted_header(&mut self, header: Header, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        if let Some(slot) = self.preformatted.iter_mut().find(|(h, _)| *h == header) {
            slot.1 = value;
        } else {
            self.preformatted.push((header, value));
        }
        self
    }

    pub fn gen_header(&self, header: Header) -> Option<&[String]> {
        self.gen_headers.get(&header).map(|v| v.as_slice())
    }

    pub(crate) fn gen_headers(&self) -> &HashMap<Header, Vec<String>> {
        &self.gen_headers
    }

    pub(crate) fn preformatted_headers(&self) -> &[(Header, String)] {
        &self.preformatted
    }

    pub fn subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.set_gen_header(Header::Subject, vec![subject.into()])
    }

    /// Set the Date header to the current local time.
    pub fn set_date(&mut self) -> &mut Self {
        let now = Local::now().format(DATE_FORMAT).to_string();
        self.set_gen_header(Header::Date, vec![now])
    }

    pub fn set_date_with_value(&mut self, date: DateTime<FixedOffset>) -> &mut Self {
        self.set_gen_header(Header::Date, vec![date.format(DATE_FORMAT).to_string()])
    }

    /// Generate and set a Message-ID of the form
    /// `<pid.random.unix_micros@hostname>`.
    pub fn set_message_id(&mut self) -> &mut Self {
        let id = generate_message_id();
        self.set_message_id_with_value(id)
    }

    pub fn set_message_id_with_value(&mut self, id: impl Into<String>) -> &mut Self {
        let id = id.into();
        let id = if id.starts_with('<') {
            id
        } else {
            format!("<{}>", id)
        };
        self.set_gen_header(Header::MessageId, vec![id])
    }

    /// Set Precedence: bulk (mailing-list style traffic).
    pub fn set_bulk(&mut self) -> &mut Self {
        self.set_gen_header(Header::Precedence, vec!["bulk"])
    }

    /// Write the importance triplet (Importance, Priority, X-Priority plus
    /// X-MSMail-Priority). Normal importance leaves the headers unset.
    pub fn set_importance(&mut self, importance: Importance) -> &mut Self {
        if importance == Importance::Normal {
            return self;
        }
        self.set_gen_header(Header::Importance, vec![importance.as_str()]);
        self.set_gen_header(Header::Priority, vec![importance.num_string()]);
        self.set_gen_header(Header::XPriority, vec![importance.xprio_string()]);
        self.set_gen_header(Header::XMsMailPriority, vec![importance.num_string()]);
        self
    }

    pub fn set_organization(&mut self, org: impl Into<String>) -> &mut Self {
        self.set_gen_header(Header::Organization, vec![org.into()])
    }

    pub fn set_user_agent(&mut self, ua: impl Into<String>) -> &mut Self {
        let ua = ua.into();
        self.set_gen_header(Header::UserAgent, vec![ua.clone()]);
        self.set_gen_header(Header::XMailer, vec![ua])
    }

    /// Suppress the default User-Agent / X-Mailer pair.
    pub fn set_no_default_user_agent(&mut self, suppress: bool) -> &mut Self {
        self.no_default_user_agent = suppress;
        self
    }

    /// Request a message disposition notification (RFC 8098) to the given
    /// address.
    pub fn request_mdn_to(&mut self, addr: &str) -> Result<(), Error> {
        let parsed = Address::parse(addr)?;
        self.set_gen_header(Header::DispositionNotificationTo, vec![parsed.to_string()]);
        Ok(())
    }

    pub fn set_list_unsubscribe(&mut self, value: impl Into<String>) -> &mut Self {
        self.set_gen_header(Header::ListUnsubscribe, vec![value.into()])
    }

    // --- body parts ---

    fn make_part(&self, content_type: ContentType, content: Vec<u8>) -> Part {
        let mut p = Part::new(content_type, content);
        p.set_charset(self.charset).set_encoding(self.encoding);
        p
    }

    /// Replace all body parts with a single part.
    pub fn set_body_string(&mut self, content_type: ContentType, body: impl Into<String>) -> &mut Self {
        let p = self.make_part(content_type, body.into().into_bytes());
        self.parts = vec![p];
        self
    }

    /// Replace all body parts with a single producer-backed part.
    pub fn set_body_writer(&mut self, content_type: ContentType, write_func: WriteFunc) -> &mut Self {
        let mut p = Part::from_writer(content_type, write_func);
        p.set_charset(self.charset).set_encoding(self.encoding);
        self.parts = vec![p];
        self
    }

    /// Append an alternative body part.
    pub fn add_alternative_string(&mut self, content_type: ContentType, body: impl Into<String>) -> &mut Self {
        let p = self.make_part(content_type, body.into().into_bytes());
        self.parts.push(p);
        self
    }

    pub fn add_alternative_writer(&mut self, content_type: ContentType, write_func: WriteFunc) -> &mut Self {
        let mut p = Part::from_writer(content_type, write_func);
        p.set_charset(self.charset).set_encoding(self.encoding);
        self.parts.push(p);
        self
    }

    /// All live (non-deleted) parts.
    pub fn get_parts(&self) -> Vec<&Part> {
        self.parts.iter().filter(|p| !p.is_deleted()).collect()
    }

    pub fn parts_mut(&mut self) -> &mut [Part] {
        &mut self.parts
    }

    // --- attachments and embeds ---

    pub fn attach(&mut self, mut file: File) -> &mut Self {
        file.set_role(FileRole::Attachment);
        self.attachments.push(file);
        self
    }

    pub fn attach_file(&mut self, path: impl AsRef<std::path::Path>) -> &mut Self {
        self.attach(File::from_path(path))
    }

    pub fn attach_reader(&mut self, name: impl Into<String>, reader: impl std::io::Read) -> std::io::Result<&mut Self> {
        let file = File::from_reader(name, reader)?;
        Ok(self.attach(file))
    }

    pub fn embed(&mut self, mut file: File) -> &mut Self {
        file.set_role(FileRole::Inline);
        self.embeds.push(file);
        self
    }

    pub fn embed_file(&mut self, path: impl AsRef<std::path::Path>) -> &mut Self {
        self.embed(File::from_path(path))
    }

    pub fn embed_reader(&mut self, name: impl Into<String>, reader: impl std::io::Read) -> std::io::Result<&mut Self> {
        let file = File::from_reader(name, reader)?;
        Ok(self.embed(file))
    }

    /// Mark the attachment at `index` as deleted. Out-of-range is a no-op.
    pub fn delete_attachment(&mut self, index: usize) {
        if let Some(f) = self.attachments.get_mut(index) {
            f.delete();
        }
    }

    pub fn delete_embed(&mut self, index: usize) {
        if let Some(f) = self.embeds.get_mut(index) {
            f.delete();
        }
    }

    pub fn get_attachments(&self) -> Vec<&File> {
        self.attachments.iter().filter(|f| !f.is_deleted()).collect()
    }

    pub fn get_embeds(&self) -> Vec<&File> {
        self.embeds.iter().filter(|f| !f.is_deleted()).collect()
    }

    // --- multipart / PGP ---

    /// Seed the outermost multipart boundary instead of generating one.
    pub fn set_boundary(&mut self, boundary: impl Into<String>) -> Result<(), Error> {
        let boundary = boundary.into();
        if !is_valid_boundary(&boundary) {
            return Err(Error::InvalidBoundary(boundary));
        }
        self.boundary = Some(boundary);
        Ok(())
    }

    pub fn boundary(&self) -> Option<&str> {
        self.boundary.as_deref()
    }

    pub fn set_pgp_mode(&mut self, mode: PgpMode) -> &mut Self {
        self.pgp_mode = mode;
        self
    }

    pub fn pgp_mode(&self) -> PgpMode {
        self.pgp_mode
    }

    // --- delivery state ---

    pub fn is_delivered(&self) -> bool {
        self.delivered
    }

    pub fn send_error(&self) -> Option<&SendError> {
        self.send_error.as_ref()
    }

    pub(crate) fn set_delivered(&mut self, delivered: bool) {
        self.delivered = delivered;
    }

    pub(crate) fn set_send_error(&mut self, err: Option<SendError>) {
        self.send_error = err;
    }

    // --- serialization entry points ---

    /// Apply the defaults the serializer guarantees: Date, Message-ID,
    /// MIME-Version, and the library identification unless suppressed.
    pub(crate) fn apply_default_headers(&mut self) {
        if !self.gen_headers.contains_key(&Header::Date) {
            self.set_date();
        }
        if !self.gen_headers.contains_key(&Header::MessageId) {
            self.set_message_id();
        }
        if !self.gen_headers.contains_key(&Header::MimeVersion) {
            let v = self.mime_version().to_string();
            self.set_gen_header(Header::MimeVersion, vec![v]);
        }
        if !self.no_default_user_agent {
            if !self.gen_headers.contains_key(&Header::UserAgent) {
                self.set_gen_header(Header::UserAgent, vec![USER_AGENT]);
            }
            if !self.gen_headers.contains_key(&Header::XMailer) {
                self.set_gen_header(Header::XMailer, vec![USER_AGENT]);
            }
        }
    }

    /// Serialize the message into any byte sink. Returns bytes written.
    pub fn write_to<W: std::io::Write>(&mut self, w: W) -> Result<u64, Error> {
        let mut mw = MsgWriter::new(w);
        mw.write_msg(self)?;
        Ok(mw.bytes_written())
    }

    /// Serialize into an in-memory buffer.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Write the message as an RFC 5322 `.eml` file.
    pub fn write_to_file(&mut self, path: impl AsRef<std::path::Path>) -> Result<(), Error> {
        let f = std::fs::File::create(path)?;
        let mut w = std::io::BufWriter::new(f);
        self.write_to(&mut w)?;
        use std::io::Write;
        w.flush()?;
        Ok(())
    }

    /// Write the message to a fresh `.eml` file in the OS temp directory
    /// and return its path.
    pub fn write_to_temp_file(&mut self) -> Result<std::path::PathBuf, Error> {
        let name = format!(
            "{}_{}_{}.eml",
            std::process::id(),
            random_string(12),
            Utc::now().timestamp_micros()
        );
        let path = std::env::temp_dir().join(name);
        self.write_to_file(&path)?;
        Ok(path)
    }
}

fn random_string(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Message-ID of the form `<pid.random.unix_micros@hostname>`.
fn generate_message_id() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string());
    format!(
        "<{}.{}.{}@{}>",
        std::process::id(),
        random_string(22),
        Utc::now().timestamp_micros(),
        host
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_holds_exactly_one_address() {
        let mut m = Msg::new();
        m.from("a@example.com").unwrap();
        m.from("b@example.com").unwrap();
        assert_eq!(m.addresses(AddrHeader::From).len(), 1);
        assert_eq!(m.addresses(AddrHeader::From)[0].addr_spec(), "b@example.com");
    }

    #[test]
    fn invalid_address_is_rejected() {
        let mut m = Msg::new();
        assert!(m.from("not an address").is_err());
        assert!(m.to(&["also bad"]).is_err());
    }

    #[test]
    fn recipients_union_dedup_order() {
        let mut m = Msg::new();
        m.to(&["a@x.tld", "b@x.tld"]).unwrap();
        m.cc(&["b@x.tld", "c@x.tld"]).unwrap();
        m.bcc(&["a@x.tld", "d@x.tld"]).unwrap();
        assert_eq!(
            m.get_recipients().unwrap(),
            vec!["a@x.tld", "b@x.tld", "c@x.tld", "d@x.tld"]
        );
    }

    #[test]
    fn no_recipients_is_an_error() {
        let m = Msg::new();
        assert!(matches!(m.get_recipients(), Err(Error::NoRcptAddresses)));
    }

    #[test]
    fn sender_prefers_envelope_from() {
        let mut m = Msg::new();
        m.from("header@x.tld").unwrap();
        m.envelope_from("envelope@x.tld").unwrap();
        assert_eq!(m.get_sender(true).unwrap(), "envelope@x.tld");
        assert_eq!(m.get_sender(false).unwrap(), "header@x.tld");
    }

    #[test]
    fn sender_missing_is_an_error() {
        let m = Msg::new();
        assert!(matches!(m.get_sender(true), Err(Error::NoFromAddress)));
    }

    #[test]
    fn set_body_replaces_alternative_appends() {
        let mut m = Msg::new();
        m.set_body_string(ContentType::text_plain(), "one");
        m.add_alternative_string(ContentType::text_html(), "<p>one</p>");
        assert_eq!(m.get_parts().len(), 2);
        m.set_body_string(ContentType::text_plain(), "two");
        assert_eq!(m.get_parts().len(), 1);
    }

    #[test]
    fn deleted_parts_are_hidden() {
        let mut m = Msg::new();
        m.set_body_string(ContentType::text_plain(), "one");
        m.add_alternative_string(ContentType::text_html(), "<p>one</p>");
        m.parts_mut()[0].delete();
        assert_eq!(m.get_parts().len(), 1);
        assert_eq!(m.get_parts()[0].content_type().as_str(), "text/html");
    }

    #[test]
    fn delete_attachment_marks_without_removing() {
        let mut m = Msg::new();
        m.attach(File::from_bytes("a.txt", b"a".to_vec()));
        m.attach(File::from_bytes("b.txt", b"b".to_vec()));
        m.delete_attachment(0);
        let live = m.get_attachments();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].name(), "b.txt");
    }

    #[test]
    fn message_id_format() {
        let mut m = Msg::new();
        m.set_message_id();
        let id = &m.gen_header(Header::MessageId).unwrap()[0];
        assert!(id.starts_with('<') && id.ends_with('>'));
        let inner = &id[1..id.len() - 1];
        let (left, host) = inner.split_once('@').unwrap();
        assert!(!host.is_empty());
        // pid.random.unix_micros
        assert_eq!(left.split('.').count(), 3);
    }

    #[test]
    fn default_headers_applied_once() {
        let mut m = Msg::new();
        m.apply_default_headers();
        assert!(m.gen_header(Header::Date).is_some());
        assert!(m.gen_header(Header::MessageId).is_some());
        assert_eq!(m.gen_header(Header::MimeVersion).unwrap()[0], "1.0");
        assert!(m.gen_header(Header::UserAgent).is_some());
        let id = m.gen_header(Header::MessageId).unwrap()[0].clone();
        m.apply_default_headers();
        assert_eq!(m.gen_header(Header::MessageId).unwrap()[0], id);
    }

    #[test]
    fn no_default_user_agent_suppressed() {
        let mut m = Msg::new();
        m.set_no_default_user_agent(true);
        m.apply_default_headers();
        assert!(m.gen_header(Header::UserAgent).is_none());
        assert!(m.gen_header(Header::XMailer).is_none());
    }

    #[test]
    fn importance_headers() {
        let mut m = Msg::new();
        m.set_importance(Importance::High);
        assert_eq!(m.gen_header(Header::Importance).unwrap()[0], "high");
        assert_eq!(m.gen_header(Header::Priority).unwrap()[0], "1");
        assert_eq!(m.gen_header(Header::XPriority).unwrap()[0], "1");
        let mut n = Msg::new();
        n.set_importance(Importance::Normal);
        assert!(n.gen_header(Header::Importance).is_none());
    }

    #[test]
    fn bulk_precedence() {
        let mut m = Msg::new();
        m.set_bulk();
        assert_eq!(m.gen_header(Header::Precedence).unwrap()[0], "bulk");
    }

    #[test]
    fn boundary_validation_on_set() {
        let mut m = Msg::new();
        assert!(m.set_boundary("valid-boundary-123").is_ok());
        assert!(m.set_boundary("bad boundary with spaces").is_err());
    }
}
