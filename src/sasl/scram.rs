/*
 * scram.rs
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

//! SCRAM-SHA-1 and SCRAM-SHA-256 SASL client (RFC 5802, RFC 7677), with
//! the -PLUS channel-binding variants (RFC 5929 / RFC 9266 gs2 headers).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::SaslError;

/// Hash family for the SCRAM key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScramHash {
    Sha1,
    Sha256,
}

impl ScramHash {
    fn hmac(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        match self {
            ScramHash::Sha1 => {
                let mut mac =
                    Hmac::<Sha1>::new_from_slice(key).expect("any key length works");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            ScramHash::Sha256 => {
                let mut mac =
                    Hmac::<Sha256>::new_from_slice(key).expect("any key length works");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }

    fn h(&self, data: &[u8]) -> Vec<u8> {
        match self {
            ScramHash::Sha1 => Sha1::digest(data).to_vec(),
            ScramHash::Sha256 => Sha256::digest(data).to_vec(),
        }
    }

    /// Hi(): PBKDF2 over the password with the server salt.
    fn hi(&self, password: &str, salt: &[u8], iterations: u32) -> Vec<u8> {
        match self {
            ScramHash::Sha1 => {
                let mut out = [0u8; 20];
                pbkdf2_hmac::<Sha1>(password.as_bytes(), salt, iterations, &mut out);
                out.to_vec()
            }
            ScramHash::Sha256 => {
                let mut out = [0u8; 32];
                pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
                out.to_vec()
            }
        }
    }
}

/// State carried across the three-step exchange.
#[derive(Debug, Clone)]
pub struct ScramState {
    hash: ScramHash,
    client_nonce: String,
    /// gs2 header + raw channel-binding data; the `c=` attribute value.
    cbind_input: Vec<u8>,
    client_first_bare: String,
    /// Expected server signature, available after `client_final`.
    server_signature: Option<Vec<u8>>,
}

impl ScramState {
    /// True once `client_final` ran and the next server message must be
    /// the server-final signature.
    pub fn awaiting_server_final(&self) -> bool {
        self.server_signature.is_some()
    }
}

/// Build client-first-message. `channel_binding` is `(type, data)` for the
/// -PLUS variants (e.g. `("tls-exporter", material)`); without it the gs2
/// header signals no channel binding.
pub fn client_first(
    hash: ScramHash,
    authcid: &str,
    channel_binding: Option<(&str, &[u8])>,
) -> (Vec<u8>, ScramState) {
    let nonce: String = OsRng
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    client_first_with_nonce(hash, authcid, channel_binding, nonce)
}

/// Deterministic variant used by the tests (RFC vectors inject the nonce).
pub(crate) fn client_first_with_nonce(
    hash: ScramHash,
    authcid: &str,
    channel_binding: Option<(&str, &[u8])>,
    nonce: String,
) -> (Vec<u8>, ScramState) {
    let gs2_header = match channel_binding {
        Some((kind, _)) => format!("p={},,", kind),
        None => "n,,".to_string(),
    };
    let mut cbind_input = gs2_header.as_bytes().to_vec();
    if let Some((_, data)) = channel_binding {
        cbind_input.extend_from_slice(data);
    }
    let client_first_bare = format!("n={},r={}", sasl_name(authcid), nonce);
    let message = format!("{}{}", gs2_header, client_first_bare);
    let state = ScramState {
        hash,
        client_nonce: nonce,
        cbind_input,
        client_first_bare,
        server_signature: None,
    };
    (message.into_bytes(), state)
}

/// Build client-final-message from the decoded server-first-message and the
/// password. Stores the expected server signature in the state.
pub fn client_final(
    state: &mut ScramState,
    server_first: &str,
    password: &str,
) -> Result<Vec<u8>, SaslError> {
    let (nonce, salt_b64, iter_str) = parse_server_first(server_first)?;
    if !nonce.starts_with(&state.client_nonce) {
        return Err(SaslError::invalid("server nonce must extend client nonce"));
    }
    let salt = STANDARD
        .decode(salt_b64.as_bytes())
        .map_err(|_| SaslError::invalid("invalid salt base64"))?;
    let iterations: u32 = iter_str
        .parse()
        .map_err(|_| SaslError::invalid("invalid iteration count"))?;

    let hash = state.hash;
    let salted_password = hash.hi(password, &salt, iterations);
    let client_key = hash.hmac(&salted_password, b"Client Key");
    let stored_key = hash.h(&client_key);
    let server_key = hash.hmac(&salted_password, b"Server Key");

    let client_final_no_proof =
        format!("c={},r={}", STANDARD.encode(&state.cbind_input), nonce);
    let auth_message = format!(
        "{},{},{}",
        state.client_first_bare, server_first, client_final_no_proof
    );
    let client_signature = hash.hmac(&stored_key, auth_message.as_bytes());
    let client_proof: Vec<u8> = client_key
        .iter()
        .zip(client_signature.iter())
        .map(|(a, b)| a ^ b)
        .collect();
    state.server_signature = Some(hash.hmac(&server_key, auth_message.as_bytes()));

    let message = format!(
        "{},p={}",
        client_final_no_proof,
        STANDARD.encode(client_proof)
    );
    Ok(message.into_bytes())
}

/// Check the decoded server-final-message (`v=<signature>`) against the
/// signature computed in `client_final`.
pub fn verify_server_final(state: &ScramState, server_final: &str) -> Result<(), SaslError> {
    let expected = state
        .server_signature
        .as_ref()
        .ok_or_else(|| SaslError::invalid("server-final before client-final"))?;
    let v = server_final
        .split(',')
        .find_map(|p| p.trim().strip_prefix("v="))
        .ok_or_else(|| SaslError::invalid("missing v in server-final"))?;
    let got = STANDARD
        .decode(v.as_bytes())
        .map_err(|_| SaslError::invalid("invalid signature base64"))?;
    if &got != expected {
        return Err(SaslError::ServerSignature);
    }
    Ok(())
}

/// Escape `=` and `,` in the SASL username (RFC 5802 §5.1 `n=` attribute).
fn sasl_name(s: &str) -> String {
    s.replace('=', "=3D").replace(',', "=2C")
}

fn parse_server_first(input: &str) -> Result<(String, String, String), SaslError> {
    let mut r = None;
    let mut s = None;
    let mut i = None;
    for part in input.split(',') {
        let part = part.trim();
        if let Some(v) = part.strip_prefix("r=") {
            r = Some(v.to_string());
        } else if let Some(v) = part.strip_prefix("s=") {
            s = Some(v.to_string());
        } else if let Some(v) = part.strip_prefix("i=") {
            i = Some(v.to_string());
        }
    }
    let r = r.ok_or_else(|| SaslError::invalid("missing r in server-first"))?;
    let s = s.ok_or_else(|| SaslError::invalid("missing s in server-first"))?;
    let i = i.ok_or_else(|| SaslError::invalid("missing i in server-first"))?;
    Ok((r, s, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc_5802_sha1_vector() {
        let (first, mut state) = client_first_with_nonce(
            ScramHash::Sha1,
            "user",
            None,
            "fyko+d2lbbFgONRv9qkxdawL".to_string(),
        );
        assert_eq!(
            String::from_utf8(first).unwrap(),
            "n,,n=user,r=fyko+d2lbbFgONRv9qkxdawL"
        );
        let server_first =
            "r=fyko+d2lbbFgONRv9qkxdawL3rfcNHYJY1ZVvWVs7j,s=QSXCR+Q6sek8bf92,i=4096";
        let final_msg = client_final(&mut state, server_first, "pencil").unwrap();
        assert_eq!(
            String::from_utf8(final_msg).unwrap(),
            "c=biws,r=fyko+d2lbbFgONRv9qkxdawL3rfcNHYJY1ZVvWVs7j,p=v0X8v3Bz2T0CJGbJQyF0X+HI4Ts="
        );
        verify_server_final(&state, "v=rmF9pqV8S7suAoZWja4dJRkFsKQ=").unwrap();
    }

    #[test]
    fn rfc_7677_sha256_vector() {
        let (first, mut state) = client_first_with_nonce(
            ScramHash::Sha256,
            "user",
            None,
            "rOprNGfwEbeRWgbNEkqO".to_string(),
        );
        assert_eq!(
            String::from_utf8(first).unwrap(),
            "n,,n=user,r=rOprNGfwEbeRWgbNEkqO"
        );
        let server_first = "r=rOprNGfwEbeRWgbNEkqO%hvYDpWUa2RaTCAfuxFIlj)hNlF$k0,s=W22ZaJ0SNY7soEsUEjb6gQ==,i=4096";
        let final_msg = client_final(&mut state, server_first, "pencil").unwrap();
        assert_eq!(
            String::from_utf8(final_msg).unwrap(),
            "c=biws,r=rOprNGfwEbeRWgbNEkqO%hvYDpWUa2RaTCAfuxFIlj)hNlF$k0,p=dHzbZapWIk4jUhN+Ute9ytag9zjfMHgsqmmiz7AndVQ="
        );
        verify_server_final(&state, "v=6rriTRBi23WpRR/wtup+mMhUZUn/dB5nLTJRsjl95G4=").unwrap();
    }

    #[test]
    fn bad_server_signature_rejected() {
        let (_, mut state) = client_first_with_nonce(
            ScramHash::Sha256,
            "user",
            None,
            "rOprNGfwEbeRWgbNEkqO".to_string(),
        );
        let server_first = "r=rOprNGfwEbeRWgbNEkqO%hvYDpWUa2RaTCAfuxFIlj)hNlF$k0,s=W22ZaJ0SNY7soEsUEjb6gQ==,i=4096";
        client_final(&mut state, server_first, "pencil").unwrap();
        assert!(matches!(
            verify_server_final(&state, "v=AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="),
            Err(SaslError::ServerSignature)
        ));
    }

    #[test]
    fn server_nonce_must_extend_client_nonce() {
        let (_, mut state) = client_first_with_nonce(
            ScramHash::Sha256,
            "user",
            None,
            "clientnonce".to_string(),
        );
        let err = client_final(&mut state, "r=unrelated,s=QSXCR+Q6sek8bf92,i=4096", "x");
        assert!(err.is_err());
    }

    #[test]
    fn channel_binding_gs2_header() {
        let cb_data = b"exported-material";
        let (first, mut state) = client_first_with_nonce(
            ScramHash::Sha256,
            "user",
            Some(("tls-exporter", cb_data)),
            "nonce123".to_string(),
        );
        let first = String::from_utf8(first).unwrap();
        assert!(first.starts_with("p=tls-exporter,,n=user,r=nonce123"), "{}", first);

        let server_first = "r=nonce123server,s=QSXCR+Q6sek8bf92,i=4096";
        let final_msg = client_final(&mut state, server_first, "pw").unwrap();
        let final_msg = String::from_utf8(final_msg).unwrap();
        let c_value = final_msg
            .split(',')
            .find_map(|p| p.strip_prefix("c="))
            .unwrap();
        let mut expected = b"p=tls-exporter,,".to_vec();
        expected.extend_from_slice(cb_data);
        assert_eq!(STANDARD.decode(c_value).unwrap(), expected);
    }

    #[test]
    fn username_special_chars_escaped() {
        let (first, _) = client_first_with_nonce(
            ScramHash::Sha256,
            "who,am=i",
            None,
            "n".to_string(),
        );
        let s = String::from_utf8(first).unwrap();
        assert!(s.contains("n=who=2Cam=3Di,"), "{}", s);
    }
}
