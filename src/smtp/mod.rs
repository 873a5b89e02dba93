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

//! SMTP protocol layer: session, responses, dot-stuffed DATA writer, and
//! the plain/TLS connection wrapper used for connection reuse.

pub mod client;
pub mod dot_stuffer;

pub use client::{DataWriter, Response, SmtpSession};
pub use dot_stuffer::DotStuffer;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Error, SendErrReason};
use crate::net::{PlainStream, TlsStreamWrapper};
use crate::sasl::SmtpAuthType;

/// An established SMTP session over either a plain or a TLS stream.
/// Held by the high-level client across sends for connection reuse.
pub enum SmtpConnection {
    Plain(SmtpSession<PlainStream>),
    Tls(SmtpSession<TlsStreamWrapper>),
}

impl SmtpConnection {
    pub fn is_tls(&self) -> bool {
        matches!(self, SmtpConnection::Tls(_))
    }

    pub fn has_channel_binding(&self) -> bool {
        match self {
            SmtpConnection::Plain(s) => s.has_channel_binding(),
            SmtpConnection::Tls(s) => s.has_channel_binding(),
        }
    }

    pub fn supports(&self, keyword: &str) -> bool {
        match self {
            SmtpConnection::Plain(s) => s.supports(keyword),
            SmtpConnection::Tls(s) => s.supports(keyword),
        }
    }

    pub fn ext_param(&self, keyword: &str) -> Option<&str> {
        match self {
            SmtpConnection::Plain(s) => s.ext_param(keyword),
            SmtpConnection::Tls(s) => s.ext_param(keyword),
        }
    }

    pub fn advertised_auth(&self) -> Vec<String> {
        match self {
            SmtpConnection::Plain(s) => s.advertised_auth(),
            SmtpConnection::Tls(s) => s.advertised_auth(),
        }
    }

    pub async fn ehlo(&mut self, name: &str) -> Result<(), Error> {
        match self {
            SmtpConnection::Plain(s) => s.ehlo(name).await,
            SmtpConnection::Tls(s) => s.ehlo(name).await,
        }
    }

    pub async fn auth(
        &mut self,
        mechanism: SmtpAuthType,
        username: &str,
        password: &str,
    ) -> Result<(), Error> {
        match self {
            SmtpConnection::Plain(s) => s.auth(mechanism, username, password).await,
            SmtpConnection::Tls(s) => s.auth(mechanism, username, password).await,
        }
    }

    pub async fn mail_from(&mut self, addr: &str, params: &str) -> Result<Response, Error> {
        match self {
            SmtpConnection::Plain(s) => s.mail_from(addr, params).await,
            SmtpConnection::Tls(s) => s.mail_from(addr, params).await,
        }
    }

    pub async fn rcpt_to(&mut self, addr: &str, params: &str) -> Result<Response, Error> {
        match self {
            SmtpConnection::Plain(s) => s.rcpt_to(addr, params).await,
            SmtpConnection::Tls(s) => s.rcpt_to(addr, params).await,
        }
    }

    pub async fn send_data(&mut self, content: &[u8]) -> Result<Response, Error> {
        match self {
            SmtpConnection::Plain(s) => s.send_data(content).await,
            SmtpConnection::Tls(s) => s.send_data(content).await,
        }
    }

    /// DATA with stage-attributed failures: opening the stream, writing
    /// content and closing it map onto distinct send-error reasons.
    pub async fn transmit_data(
        &mut self,
        content: &[u8],
    ) -> Result<Response, (SendErrReason, Error)> {
        match self {
            SmtpConnection::Plain(s) => transmit_data_staged(s, content).await,
            SmtpConnection::Tls(s) => transmit_data_staged(s, content).await,
        }
    }

    pub async fn rset(&mut self) -> Result<Response, Error> {
        match self {
            SmtpConnection::Plain(s) => s.rset().await,
            SmtpConnection::Tls(s) => s.rset().await,
        }
    }

    pub async fn noop(&mut self) -> Result<Response, Error> {
        match self {
            SmtpConnection::Plain(s) => s.noop().await,
            SmtpConnection::Tls(s) => s.noop().await,
        }
    }

    pub async fn vrfy(&mut self, addr: &str) -> Result<Response, Error> {
        match self {
            SmtpConnection::Plain(s) => s.vrfy(addr).await,
            SmtpConnection::Tls(s) => s.vrfy(addr).await,
        }
    }

    pub async fn quit(&mut self) -> Result<(), Error> {
        match self {
            SmtpConnection::Plain(s) => s.quit().await,
            SmtpConnection::Tls(s) => s.quit().await,
        }
    }
}

async fn transmit_data_staged<S: AsyncRead + AsyncWrite + Unpin>(
    session: &mut SmtpSession<S>,
    content: &[u8],
) -> Result<Response, (SendErrReason, Error)> {
    let mut w = session
        .data()
        .await
        .map_err(|e| (SendErrReason::SmtpData, e))?;
    w.write_all(content)
        .await
        .map_err(|e| (SendErrReason::WriteContent, e))?;
    w.close()
        .await
        .map_err(|e| (SendErrReason::SmtpDataClose, e))
}
