/*
 * address.rs
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

//! RFC 5322 mailbox: optional display name plus addr-spec, with a strict
//! parser for caller input and a lenient list variant that keeps the
//! parsable subset.

use crate::error::Error;

/// A single RFC 5322 mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub display_name: Option<String>,
    pub local_part: String,
    pub domain: String,
}

impl Address {
    pub fn new(
        display_name: Option<impl Into<String>>,
        local_part: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.map(|s| s.into()),
            local_part: local_part.into(),
            domain: domain.into(),
        }
    }

    /// The addr-spec: local-part@domain. Used for MAIL FROM / RCPT TO.
    pub fn addr_spec(&self) -> String {
        format!("{}@{}", self.local_part, self.domain)
    }

    /// Parse one mailbox in strict mode. Accepted forms: `addr-spec`,
    /// `<addr-spec>`, `phrase <addr-spec>` and `"quoted phrase" <addr-spec>`.
    /// Anything that does not parse completely is an error.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let fail = || Error::AddressParse(input.to_string());
        let s = input.trim();
        if s.is_empty() {
            return Err(fail());
        }
        if let Some(stripped) = s.strip_suffix('>') {
            // display-name? <addr-spec>
            let open = stripped.rfind('<').ok_or_else(fail)?;
            let phrase = stripped[..open].trim();
            let spec = stripped[open + 1..].trim();
            let (local, domain) = split_addr_spec(spec).ok_or_else(fail)?;
            let display_name = parse_phrase(phrase).ok_or_else(fail)?;
            Ok(Address::new(display_name, local, domain))
        } else {
            if s.contains('<') {
                return Err(fail());
            }
            let (local, domain) = split_addr_spec(s).ok_or_else(fail)?;
            Ok(Address::new(None::<String>, local, domain))
        }
    }

    /// Parse a slice of inputs, silently dropping entries that fail the
    /// strict parser.
    pub fn parse_ignore_invalid<S: AsRef<str>>(inputs: &[S]) -> Vec<Self> {
        inputs
            .iter()
            .filter_map(|s| Self::parse(s.as_ref()).ok())
            .collect()
    }
}

/// Validate the phrase before an angle-addr. Returns Some(None) for an
/// empty phrase, Some(Some(name)) for a valid one, None on garbage such as
/// an unterminated quote.
fn parse_phrase(phrase: &str) -> Option<Option<String>> {
    if phrase.is_empty() {
        return Some(None);
    }
    if let Some(rest) = phrase.strip_prefix('"') {
        let inner = rest.strip_suffix('"')?;
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => out.push(chars.next()?),
                '"' => return None,
                _ => out.push(c),
            }
        }
        return Some(Some(out));
    }
    // Unquoted phrase: atoms and whitespace only.
    if phrase
        .chars()
        .all(|c| c == ' ' || c == '\t' || is_atext_char(c))
    {
        Some(Some(phrase.to_string()))
    } else {
        None
    }
}

fn is_atext_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '/' | '='
                | '?' | '^' | '_' | '`' | '{' | '|' | '}' | '~'
        )
}

/// Split and validate an addr-spec into (local-part, domain).
fn split_addr_spec(spec: &str) -> Option<(String, String)> {
    if spec.is_empty() {
        return None;
    }
    let (local, domain) = if spec.starts_with('"') {
        // Quoted local part: find the closing quote, then expect @domain.
        let mut end = None;
        let bytes = spec.as_bytes();
        let mut i = 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'"' => {
                    end = Some(i);
                    break;
                }
                _ => i += 1,
            }
        }
        let end = end?;
        let rest = &spec[end + 1..];
        let domain = rest.strip_prefix('@')?;
        (&spec[..end + 1], domain)
    } else {
        let at = spec.rfind('@')?;
        (&spec[..at], &spec[at + 1..])
    };
    if !is_valid_local_part(local) || !is_valid_domain(domain) {
        return None;
    }
    Some((local.to_string(), domain.to_string()))
}

/// dot-atom (no leading/trailing/consecutive dots) or quoted-string.
fn is_valid_local_part(local: &str) -> bool {
    if local.is_empty() || local.len() > 64 {
        return false;
    }
    if local.starts_with('"') && local.ends_with('"') && local.len() >= 2 {
        return local[1..local.len() - 1]
            .chars()
            .all(|c| c != '\r' && c != '\n');
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    local.chars().all(|c| c == '.' || is_atext_char(c))
}

/// dot-atom of LDH labels, or a bracketed address literal.
fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 255 {
        return false;
    }
    if domain.starts_with('[') && domain.ends_with(']') {
        return domain[1..domain.len() - 1]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | ':'));
    }
    domain.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

/// True when the display name can be written as an unquoted phrase.
fn phrase_is_atom_safe(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_atext_char)
}

impl std::fmt::Display for Address {
    /// RFC 5322 mailbox form: `Display Name <local@domain>`, display name
    /// quoted when it is not a plain atom, bare `<local@domain>` otherwise.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.display_name.as_deref() {
            Some(dn) if !dn.is_empty() => {
                if phrase_is_atom_safe(dn) {
                    write!(f, "{} <{}>", dn, self.addr_spec())
                } else {
                    let escaped = dn.replace('\\', "\\\\").replace('"', "\\\"");
                    write!(f, "\"{}\" <{}>", escaped, self.addr_spec())
                }
            }
            _ => write!(f, "<{}>", self.addr_spec()),
        }
    }
}
