/*
 * lib.rs
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

//! Francobollo: programmatic email composition and SMTP submission.
//!
//! Build RFC 5322 / MIME messages ([`Msg`]) from parts, attachments and
//! embeds, then deliver them over an SMTP session ([`Client`]) with
//! STARTTLS or implicit TLS, SASL authentication (PLAIN, LOGIN, CRAM-MD5,
//! XOAUTH2, SCRAM-SHA-1/256 ± channel binding) and DSN support. Messages
//! can also be written to `.eml` files.
//!
//! ```no_run
//! use francobollo::{Client, ContentType, Msg, SmtpAuthType};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut msg = Msg::new();
//! msg.from("\"Toni Tester\" <tester@domain.tld>")?;
//! msg.to(&["rcpt@domain.tld"])?;
//! msg.subject("Hello");
//! msg.set_body_string(ContentType::text_plain(), "Test");
//!
//! let mut client = Client::new("mail.domain.tld");
//! client
//!     .set_smtp_auth(SmtpAuthType::AutoDiscover)
//!     .set_username("tester")
//!     .set_password("secret");
//! client.dial_and_send(&mut [msg]).await?;
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod header;
pub mod mime;
pub mod msg;
pub mod net;
pub mod sasl;
pub mod smtp;

pub use client::{Client, DsnMailReturn, DsnNotify, DEFAULT_PORT, DEFAULT_TIMEOUT};
pub use error::{Error, SendErrReason, SendError};
pub use header::{AddrHeader, Header, Importance};
pub use mime::{Charset, ContentType, Encoding};
pub use msg::{Address, File, FileRole, Msg, MsgWriter, Part, PgpMode};
pub use net::TlsPolicy;
pub use sasl::SmtpAuthType;
