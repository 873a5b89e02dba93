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

//! SASL client mechanisms: PLAIN, LOGIN, CRAM-MD5, XOAUTH2 and
//! SCRAM-SHA-1/256 with and without channel binding, plus mechanism
//! auto-discovery against the server's AUTH capability list.

mod cram_md5;
mod mechanism;
mod plain;
mod scram;

pub use cram_md5::cram_md5_response;
pub use mechanism::SmtpAuthType;
pub use plain::{login_response, plain_initial_response};
pub use scram::{client_final, client_first, verify_server_final, ScramHash, ScramState};

/// SASL negotiation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SaslError {
    /// Malformed or unexpected server message.
    #[error("invalid SASL server message: {0}")]
    Invalid(String),

    /// The server rejected the credentials.
    #[error("authentication failed: {0}")]
    Failed(String),

    /// A -PLUS mechanism was selected but no channel-binding material can
    /// be retrieved from the TLS session.
    #[error("channel binding material unavailable")]
    ChannelBindingUnavailable,

    /// A TLS-only mechanism was selected on a plaintext connection.
    #[error("mechanism {0} requires a TLS connection")]
    TlsRequired(&'static str),

    /// The server-final signature did not verify.
    #[error("SCRAM server signature verification failed")]
    ServerSignature,
}

impl SaslError {
    pub fn invalid(msg: &str) -> Self {
        Self::Invalid(msg.to_string())
    }
}

impl SmtpAuthType {
    /// SCRAM hash family for this mechanism, if it is a SCRAM variant.
    pub fn scram_hash(&self) -> Option<ScramHash> {
        match self {
            SmtpAuthType::ScramSha1 | SmtpAuthType::ScramSha1Plus => Some(ScramHash::Sha1),
            SmtpAuthType::ScramSha256 | SmtpAuthType::ScramSha256Plus => Some(ScramHash::Sha256),
            _ => None,
        }
    }
}

/// XOAUTH2 initial response, before base64. There is no challenge round;
/// the whole exchange is this one blob of Ctrl-A-terminated fields, closed
/// by an empty field. `password` on the client option surface doubles as
/// the OAuth2 access token here.
pub fn xoauth2_initial_response(address: &str, token: &str) -> Vec<u8> {
    const FIELD_END: u8 = 0x01;
    let mut blob = Vec::with_capacity(address.len() + token.len() + 24);
    blob.extend_from_slice(b"user=");
    blob.extend_from_slice(address.as_bytes());
    blob.push(FIELD_END);
    blob.extend_from_slice(b"auth=Bearer ");
    blob.extend_from_slice(token.as_bytes());
    blob.push(FIELD_END);
    blob.push(FIELD_END);
    blob
}

/// Discovery priority, strongest first.
const DISCOVER_ORDER: [SmtpAuthType; 8] = [
    SmtpAuthType::ScramSha256Plus,
    SmtpAuthType::ScramSha256,
    SmtpAuthType::ScramSha1Plus,
    SmtpAuthType::ScramSha1,
    SmtpAuthType::XOAuth2,
    SmtpAuthType::CramMd5,
    SmtpAuthType::Plain,
    SmtpAuthType::Login,
];

/// Pick the first mechanism in priority order that the server advertises
/// and the connection state allows. Mechanisms requiring TLS are skipped on
/// plain connections; -PLUS variants additionally need channel-binding
/// material.
pub fn discover_mechanism(
    advertised: &[String],
    is_tls: bool,
    has_channel_binding: bool,
) -> Option<SmtpAuthType> {
    DISCOVER_ORDER.iter().copied().find(|m| {
        advertised.iter().any(|a| a == m.wire_name())
            && (is_tls || !m.requires_tls())
            && (!m.uses_channel_binding() || has_channel_binding)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adv(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn discovery_prefers_scram_plus_on_tls() {
        let advertised = adv(&["PLAIN", "LOGIN", "SCRAM-SHA-256", "SCRAM-SHA-256-PLUS"]);
        assert_eq!(
            discover_mechanism(&advertised, true, true),
            Some(SmtpAuthType::ScramSha256Plus)
        );
        // Without channel binding material, fall back to plain SCRAM.
        assert_eq!(
            discover_mechanism(&advertised, true, false),
            Some(SmtpAuthType::ScramSha256)
        );
    }

    #[test]
    fn discovery_skips_tls_only_mechanisms_on_plain() {
        let advertised = adv(&["PLAIN", "LOGIN", "SCRAM-SHA-256"]);
        assert_eq!(
            discover_mechanism(&advertised, false, false),
            Some(SmtpAuthType::ScramSha256)
        );
        let only_plain = adv(&["PLAIN", "LOGIN"]);
        assert_eq!(discover_mechanism(&only_plain, false, false), None);
        assert_eq!(
            discover_mechanism(&only_plain, true, false),
            Some(SmtpAuthType::Plain)
        );
    }

    #[test]
    fn discovery_priority_order() {
        let advertised = adv(&["LOGIN", "PLAIN", "CRAM-MD5", "XOAUTH2", "SCRAM-SHA-1"]);
        assert_eq!(
            discover_mechanism(&advertised, true, false),
            Some(SmtpAuthType::ScramSha1)
        );
        let advertised = adv(&["LOGIN", "PLAIN", "CRAM-MD5"]);
        assert_eq!(
            discover_mechanism(&advertised, true, false),
            Some(SmtpAuthType::CramMd5)
        );
    }

    #[test]
    fn discovery_none_supported() {
        assert_eq!(discover_mechanism(&adv(&["GSSAPI"]), true, true), None);
        assert_eq!(discover_mechanism(&[], true, true), None);
    }

    #[test]
    fn xoauth2_blob_fields() {
        let blob = xoauth2_initial_response("tester@domain.tld", "ya29.abc");
        // Two populated Ctrl-A-terminated fields, then the empty closer
        // (splitting also yields a trailing empty segment).
        let fields: Vec<&[u8]> = blob.split(|&b| b == 0x01).collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], b"user=tester@domain.tld");
        assert_eq!(fields[1], b"auth=Bearer ya29.abc");
        assert!(fields[2].is_empty() && fields[3].is_empty());
        assert_eq!(blob.last(), Some(&0x01));
    }
}
