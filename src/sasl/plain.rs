/*
 * plain.rs
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

//! PLAIN SASL (RFC 4616) and the legacy LOGIN prompt exchange.

/// Build the PLAIN initial response: NUL authzid NUL authcid NUL password.
/// The caller base64-encodes for the wire.
pub fn plain_initial_response(authzid: &str, authcid: &str, password: &str) -> Vec<u8> {
    format!("{}\0{}\0{}", authzid, authcid, password).into_bytes()
}

/// Answer one LOGIN prompt. Prompt matching is case-insensitive substring
/// ("username"/"password"); unrecognized prompts fall back to the ordered
/// convention (first prompt wants the username, the next the password).
pub fn login_response(challenge: &str, authcid: &str, password: &str, prompts_seen: usize) -> Vec<u8> {
    let c = challenge.to_ascii_lowercase();
    let value = if c.contains("username") {
        authcid
    } else if c.contains("password") {
        password
    } else if prompts_seen == 0 {
        authcid
    } else {
        password
    };
    value.as_bytes().to_vec()
}
