/*
 * mechanism.rs
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

//! SASL mechanism names and metadata.

/// Supported SMTP auth mechanisms (client-side).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpAuthType {
    /// PLAIN (RFC 4616) – requires TLS.
    Plain,
    /// PLAIN without the TLS precondition. Explicit opt-in only.
    PlainNoEnc,
    /// Legacy LOGIN – requires TLS.
    Login,
    /// LOGIN without the TLS precondition. Explicit opt-in only.
    LoginNoEnc,
    /// CRAM-MD5 (RFC 2195) – challenge-response.
    CramMd5,
    /// XOAUTH2 – OAuth2 bearer token (Gmail, Outlook). Single-shot.
    XOAuth2,
    /// SCRAM-SHA-1 (RFC 5802) – challenge-response.
    ScramSha1,
    /// SCRAM-SHA-1-PLUS – with TLS channel binding.
    ScramSha1Plus,
    /// SCRAM-SHA-256 (RFC 5802, 7677) – challenge-response.
    ScramSha256,
    /// SCRAM-SHA-256-PLUS – with TLS channel binding.
    ScramSha256Plus,
    /// Pick the strongest mechanism both sides support at connect time.
    AutoDiscover,
}

impl SmtpAuthType {
    /// The name sent on the wire in `AUTH <name>`. NoEnc variants share
    /// their base mechanism's wire name; AutoDiscover has none.
    pub fn wire_name(&self) -> &'static str {
        match self {
            SmtpAuthType::Plain | SmtpAuthType::PlainNoEnc => "PLAIN",
            SmtpAuthType::Login | SmtpAuthType::LoginNoEnc => "LOGIN",
            SmtpAuthType::CramMd5 => "CRAM-MD5",
            SmtpAuthType::XOAuth2 => "XOAUTH2",
            SmtpAuthType::ScramSha1 => "SCRAM-SHA-1",
            SmtpAuthType::ScramSha1Plus => "SCRAM-SHA-1-PLUS",
            SmtpAuthType::ScramSha256 => "SCRAM-SHA-256",
            SmtpAuthType::ScramSha256Plus => "SCRAM-SHA-256-PLUS",
            SmtpAuthType::AutoDiscover => "AUTODISCOVER",
        }
    }

    /// Mechanisms that must not run over a plaintext connection.
    pub fn requires_tls(&self) -> bool {
        matches!(
            self,
            SmtpAuthType::Plain
                | SmtpAuthType::Login
                | SmtpAuthType::XOAuth2
                | SmtpAuthType::ScramSha1Plus
                | SmtpAuthType::ScramSha256Plus
        )
    }

    /// -PLUS variants bind the exchange to the TLS channel.
    pub fn uses_channel_binding(&self) -> bool {
        matches!(
            self,
            SmtpAuthType::ScramSha1Plus | SmtpAuthType::ScramSha256Plus
        )
    }

    pub fn is_scram(&self) -> bool {
        matches!(
            self,
            SmtpAuthType::ScramSha1
                | SmtpAuthType::ScramSha1Plus
                | SmtpAuthType::ScramSha256
                | SmtpAuthType::ScramSha256Plus
        )
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_uppercase().as_str() {
            "PLAIN" => Some(SmtpAuthType::Plain),
            "PLAIN-NOENC" => Some(SmtpAuthType::PlainNoEnc),
            "LOGIN" => Some(SmtpAuthType::Login),
            "LOGIN-NOENC" => Some(SmtpAuthType::LoginNoEnc),
            "CRAM-MD5" => Some(SmtpAuthType::CramMd5),
            "XOAUTH2" => Some(SmtpAuthType::XOAuth2),
            "SCRAM-SHA-1" => Some(SmtpAuthType::ScramSha1),
            "SCRAM-SHA-1-PLUS" => Some(SmtpAuthType::ScramSha1Plus),
            "SCRAM-SHA-256" => Some(SmtpAuthType::ScramSha256),
            "SCRAM-SHA-256-PLUS" => Some(SmtpAuthType::ScramSha256Plus),
            "AUTODISCOVER" | "AUTO-DISCOVER" => Some(SmtpAuthType::AutoDiscover),
            _ => None,
        }
    }
}

impl std::fmt::Display for SmtpAuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for m in [
            SmtpAuthType::Plain,
            SmtpAuthType::Login,
            SmtpAuthType::CramMd5,
            SmtpAuthType::XOAuth2,
            SmtpAuthType::ScramSha1,
            SmtpAuthType::ScramSha1Plus,
            SmtpAuthType::ScramSha256,
            SmtpAuthType::ScramSha256Plus,
        ] {
            assert_eq!(SmtpAuthType::from_name(m.wire_name()), Some(m));
        }
    }

    #[test]
    fn noenc_variants_share_wire_names() {
        assert_eq!(SmtpAuthType::PlainNoEnc.wire_name(), "PLAIN");
        assert_eq!(SmtpAuthType::LoginNoEnc.wire_name(), "LOGIN");
        assert!(!SmtpAuthType::PlainNoEnc.requires_tls());
        assert!(!SmtpAuthType::LoginNoEnc.requires_tls());
    }

    #[test]
    fn tls_preconditions() {
        assert!(SmtpAuthType::Plain.requires_tls());
        assert!(SmtpAuthType::Login.requires_tls());
        assert!(SmtpAuthType::XOAuth2.requires_tls());
        assert!(SmtpAuthType::ScramSha256Plus.requires_tls());
        assert!(!SmtpAuthType::CramMd5.requires_tls());
        assert!(!SmtpAuthType::ScramSha256.requires_tls());
    }
}
