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

//! MIME building blocks: encodings, quoted-printable and base64 writers,
//! RFC 2047 encoded-words, header folding, boundary generation.

pub mod base64_line;
pub mod boundary;
pub mod encoding;
pub mod quoted_printable;
pub mod rfc2047;

pub use base64_line::{Base64LineWriter, MAX_BODY_LENGTH};
pub use boundary::{is_valid_boundary, random_boundary};
pub use encoding::{content_type_by_extension, Charset, ContentType, Encoding};
pub use quoted_printable::QpWriter;
pub use rfc2047::{encode_word, fold_header, needs_encoding, MAX_HEADER_LINE};
