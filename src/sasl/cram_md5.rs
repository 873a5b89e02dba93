/*
 * cram_md5.rs
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

//! CRAM-MD5 SASL (RFC 2195).

use hmac::{Hmac, Mac};
use md5::Md5;

type HmacMd5 = Hmac<Md5>;

/// Build the CRAM-MD5 response to a decoded server challenge:
/// `username SP lowercase-hex(HMAC-MD5(password, challenge))`.
pub fn cram_md5_response(authcid: &str, password: &str, challenge: &[u8]) -> Vec<u8> {
    let mut mac = HmacMd5::new_from_slice(password.as_bytes()).expect("any key length works");
    mac.update(challenge);
    let digest = mac.finalize().into_bytes();
    let mut out = String::with_capacity(authcid.len() + 1 + digest.len() * 2);
    out.push_str(authcid);
    out.push(' ');
    for b in digest {
        out.push(char::from_digit((b >> 4) as u32, 16).unwrap());
        out.push(char::from_digit((b & 15) as u32, 16).unwrap());
    }
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc_2195_vector() {
        let challenge = b"<1896.697170952@postoffice.reston.mci.net>";
        let out = cram_md5_response("tim", "tanstaaftanstaaf", challenge);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "tim b913a602c7eda7a495b4e6e7334d3890"
        );
    }

    #[test]
    fn digest_is_lowercase_hex() {
        let out = cram_md5_response("u", "p", b"<challenge@host>");
        let s = String::from_utf8(out).unwrap();
        let digest = s.split(' ').nth(1).unwrap();
        assert_eq!(digest.len(), 32);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
