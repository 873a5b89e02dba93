/*
 * header.rs
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

//! Typed header names (RFC 5322 / MIME) and the importance/priority mapping.

use crate::error::Error;

/// Generic (non-address) header names with their canonical wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Header {
    ContentDescription,
    ContentDisposition,
    ContentId,
    ContentTransferEncoding,
    ContentType,
    Date,
    DispositionNotificationTo,
    Importance,
    InReplyTo,
    ListUnsubscribe,
    ListUnsubscribePost,
    MessageId,
    MimeVersion,
    Organization,
    Precedence,
    Priority,
    References,
    Subject,
    UserAgent,
    XMailer,
    XMsMailPriority,
    XPriority,
}

impl Header {
    /// Canonical wire form of the header name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Header::ContentDescription => "Content-Description",
            Header::ContentDisposition => "Content-Disposition",
            Header::ContentId => "Content-ID",
            Header::ContentTransferEncoding => "Content-Transfer-Encoding",
            Header::ContentType => "Content-Type",
            Header::Date => "Date",
            Header::DispositionNotificationTo => "Disposition-Notification-To",
            Header::Importance => "Importance",
            Header::InReplyTo => "In-Reply-To",
            Header::ListUnsubscribe => "List-Unsubscribe",
            Header::ListUnsubscribePost => "List-Unsubscribe-Post",
            Header::MessageId => "Message-ID",
            Header::MimeVersion => "MIME-Version",
            Header::Organization => "Organization",
            Header::Precedence => "Precedence",
            Header::Priority => "Priority",
            Header::References => "References",
            Header::Subject => "Subject",
            Header::UserAgent => "User-Agent",
            Header::XMailer => "X-Mailer",
            Header::XMsMailPriority => "X-MSMail-Priority",
            Header::XPriority => "X-Priority",
        }
    }

    /// Case-insensitive parser for the closed set of recognized names.
    /// Unknown tokens are an explicit error, never a silent default.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        let all = [
            Header::ContentDescription,
            Header::ContentDisposition,
            Header::ContentId,
            Header::ContentTransferEncoding,
            Header::ContentType,
            Header::Date,
            Header::DispositionNotificationTo,
            Header::Importance,
            Header::InReplyTo,
            Header::ListUnsubscribe,
            Header::ListUnsubscribePost,
            Header::MessageId,
            Header::MimeVersion,
            Header::Organization,
            Header::Precedence,
            Header::Priority,
            Header::References,
            Header::Subject,
            Header::UserAgent,
            Header::XMailer,
            Header::XMsMailPriority,
            Header::XPriority,
        ];
        let trimmed = name.trim();
        all.iter()
            .find(|h| h.as_str().eq_ignore_ascii_case(trimmed))
            .copied()
            .ok_or_else(|| Error::UnknownHeader(name.to_string()))
    }
}

impl std::fmt::Display for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address header names. EnvelopeFrom is used only for MAIL FROM and is
/// never written into the message header section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrHeader {
    Bcc,
    Cc,
    EnvelopeFrom,
    From,
    ReplyTo,
    To,
}

impl AddrHeader {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddrHeader::Bcc => "Bcc",
            AddrHeader::Cc => "Cc",
            AddrHeader::EnvelopeFrom => "EnvelopeFrom",
            AddrHeader::From => "From",
            AddrHeader::ReplyTo => "Reply-To",
            AddrHeader::To => "To",
        }
    }
}

impl std::fmt::Display for AddrHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message importance, mapped onto the Importance/Priority/X-Priority
/// header triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Importance {
    NonUrgent,
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Importance {
    /// Value for Priority and X-MSMail-Priority ("0", "" or "1").
    pub fn num_string(&self) -> &'static str {
        match self {
            Importance::NonUrgent | Importance::Low => "0",
            Importance::Normal => "",
            Importance::High | Importance::Urgent => "1",
        }
    }

    /// Value for X-Priority ("5", "" or "1").
    pub fn xprio_string(&self) -> &'static str {
        match self {
            Importance::NonUrgent | Importance::Low => "5",
            Importance::Normal => "",
            Importance::High | Importance::Urgent => "1",
        }
    }

    /// Value for the Importance header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::NonUrgent => "non-urgent",
            Importance::Low => "low",
            Importance::Normal => "",
            Importance::High => "high",
            Importance::Urgent => "urgent",
        }
    }

    /// Case-insensitive parser for the recognized importance tokens.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name.trim().to_ascii_lowercase().as_str() {
            "non-urgent" => Ok(Importance::NonUrgent),
            "low" => Ok(Importance::Low),
            "normal" => Ok(Importance::Normal),
            "high" => Ok(Importance::High),
            "urgent" => Ok(Importance::Urgent),
            _ => Err(Error::UnknownImportance(name.to_string())),
        }
    }
}

impl std::fmt::Display for Importance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_wire_forms() {
        assert_eq!(Header::MessageId.as_str(), "Message-ID");
        assert_eq!(Header::MimeVersion.as_str(), "MIME-Version");
        assert_eq!(Header::ContentTransferEncoding.as_str(), "Content-Transfer-Encoding");
        assert_eq!(AddrHeader::ReplyTo.as_str(), "Reply-To");
    }

    #[test]
    fn header_parse_case_insensitive() {
        assert_eq!(Header::from_name("content-type").unwrap(), Header::ContentType);
        assert_eq!(Header::from_name("SUBJECT").unwrap(), Header::Subject);
        assert_eq!(Header::from_name(" mime-version ").unwrap(), Header::MimeVersion);
    }

    #[test]
    fn header_parse_unknown_fails() {
        assert!(Header::from_name("X-Unknown-Nonsense").is_err());
    }

    #[test]
    fn importance_triplets() {
        for i in [Importance::NonUrgent, Importance::Low] {
            assert_eq!(i.num_string(), "0");
            assert_eq!(i.xprio_string(), "5");
        }
        assert_eq!(Importance::NonUrgent.as_str(), "non-urgent");
        assert_eq!(Importance::Low.as_str(), "low");
        assert_eq!(Importance::Normal.num_string(), "");
        assert_eq!(Importance::Normal.xprio_string(), "");
        assert_eq!(Importance::Normal.as_str(), "");
        for i in [Importance::High, Importance::Urgent] {
            assert_eq!(i.num_string(), "1");
            assert_eq!(i.xprio_string(), "1");
        }
        assert_eq!(Importance::High.as_str(), "high");
        assert_eq!(Importance::Urgent.as_str(), "urgent");
    }

    #[test]
    fn importance_parse() {
        assert_eq!(Importance::from_name("Non-Urgent").unwrap(), Importance::NonUrgent);
        assert_eq!(Importance::from_name("URGENT").unwrap(), Importance::Urgent);
        assert!(Importance::from_name("whenever").is_err());
    }
}
