/*
 * error.rs
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

//! Library error types: build/dial/protocol/auth errors and the per-message SendError.

use std::fmt;
use std::io;

use crate::sasl::SaslError;

/// Errors raised while building a message, dialing a server, or negotiating
/// the session. Transaction-level failures inside a send are reported as
/// [`SendError`] instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Message has no From address and no envelope From.
    #[error("no From address set")]
    NoFromAddress,

    /// Message has no To, Cc or Bcc recipients.
    #[error("no recipient addresses set")]
    NoRcptAddresses,

    /// Input could not be parsed as an RFC 5322 address.
    #[error("failed to parse mail address {0:?}")]
    AddressParse(String),

    /// An unknown header name token was given to the header parser.
    #[error("unknown header name {0:?}")]
    UnknownHeader(String),

    /// An unknown importance token was given to the importance parser.
    #[error("unknown importance value {0:?}")]
    UnknownImportance(String),

    /// A caller-provided multipart boundary failed RFC 2046 validation.
    #[error("invalid multipart boundary {0:?}")]
    InvalidBoundary(String),

    /// A content encoder failed to write to its output.
    #[error("failed to write to encoder: {0}")]
    EncoderWrite(#[source] io::Error),

    /// A content encoder failed to flush on close.
    #[error("failed to close encoder: {0}")]
    EncoderClose(#[source] io::Error),

    /// A line-breaking writer was used without an output sink attached.
    #[error("no output writer defined")]
    NoOutputWriter,

    /// TCP connect failed or the server did not greet with 220.
    #[error("connection to server failed: {0}")]
    ConnectionFailed(String),

    /// The TLS policy demands encryption but the server cannot provide it.
    #[error("server does not support TLS and policy requires it")]
    TlsRequired,

    /// TLS handshake with the server failed.
    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    /// Server greeting was not a 220 reply.
    #[error("server greeting failed: {0}")]
    GreetingFailed(String),

    /// EHLO and the HELO fallback both failed.
    #[error("EHLO/HELO failed: {0}")]
    EhloFailed(String),

    /// STARTTLS was refused or the upgrade failed.
    #[error("STARTTLS failed: {0}")]
    StartTlsFailed(String),

    /// An SMTP command was answered with a 4xx/5xx reply.
    #[error("SMTP command failed: {code} {text}")]
    CommandFailed {
        code: u16,
        status: Option<String>,
        text: String,
    },

    /// Auto-discovery found no mechanism both sides support.
    #[error("no supported SMTP auth mechanism found")]
    NoSupportedAuth,

    /// The requested mechanism is not in the server's AUTH list.
    #[error("server does not support SMTP auth mechanism {0}")]
    AuthMechanismUnsupported(String),

    /// SASL negotiation failed.
    #[error("SMTP authentication failed: {0}")]
    Auth(#[from] SaslError),

    /// Read or write exceeded the session deadline.
    #[error("operation timed out")]
    Timeout,

    /// Transport-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transaction failure bubbled up from a combined dial-and-send call.
    #[error(transparent)]
    Send(#[from] SendError),
}

impl Error {
    /// A reply coded 4xx, a timeout or a broken connection is worth retrying.
    pub fn is_temp(&self) -> bool {
        match self {
            Error::CommandFailed { code, .. } => (400..500).contains(code),
            Error::Timeout => true,
            Error::Io(_) | Error::ConnectionFailed(_) => true,
            _ => false,
        }
    }
}

/// Reason codes for transaction-level failures inside a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendErrReason {
    /// Sender address could not be resolved.
    GetSender,
    /// Recipient list could not be resolved.
    GetRcpts,
    /// MAIL FROM was rejected.
    SmtpMailFrom,
    /// RCPT TO was rejected.
    SmtpRcptTo,
    /// DATA was not accepted.
    SmtpData,
    /// Closing the DATA stream failed or the final reply was negative.
    SmtpDataClose,
    /// RSET failed.
    SmtpReset,
    /// Serializing the message into the DATA stream failed.
    WriteContent,
    /// Connection liveness check failed and reconnect did not help.
    ConnCheck,
    /// Message uses 8bit transfer encoding but the server lacks 8BITMIME.
    NoUnencoded,
    /// More than one message failed; the individual errors are joined.
    Ambiguous,
}

impl SendErrReason {
    fn as_str(&self) -> &'static str {
        match self {
            SendErrReason::GetSender => "getting sender address",
            SendErrReason::GetRcpts => "getting recipient addresses",
            SendErrReason::SmtpMailFrom => "sending SMTP MAIL FROM command",
            SendErrReason::SmtpRcptTo => "sending SMTP RCPT TO command",
            SendErrReason::SmtpData => "sending SMTP DATA command",
            SendErrReason::SmtpDataClose => "closing SMTP DATA stream",
            SendErrReason::SmtpReset => "sending SMTP RESET command",
            SendErrReason::WriteContent => "sending message content",
            SendErrReason::ConnCheck => "checking SMTP connection",
            SendErrReason::NoUnencoded => "server does not support 8BITMIME",
            SendErrReason::Ambiguous => "ambiguous reason, check errors",
        }
    }
}

impl fmt::Display for SendErrReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction failure for one message (or the aggregate of several).
///
/// A copy is stored on the affected [`Msg`](crate::msg::Msg) so callers can
/// retry message by message after a partially failed send.
#[derive(Debug, Clone)]
pub struct SendError {
    /// What went wrong.
    pub reason: SendErrReason,
    /// True when the underlying reply was 4xx or the transport timed out.
    pub is_temp: bool,
    /// Underlying error messages, in occurrence order.
    pub errors: Vec<String>,
    /// Recipients affected by the failure (RCPT TO rejections).
    pub rcpt: Vec<String>,
    /// SMTP reply code, when the failure came from a reply.
    pub error_code: Option<u16>,
    /// RFC 2034 enhanced status code, when the server provided one.
    pub enhanced_status: Option<String>,
}

impl SendError {
    pub fn new(reason: SendErrReason) -> Self {
        Self {
            reason,
            is_temp: false,
            errors: Vec::new(),
            rcpt: Vec::new(),
            error_code: None,
            enhanced_status: None,
        }
    }

    /// Build a SendError from an underlying session error, taking over its
    /// reply code, enhanced status and transient flag.
    pub fn from_err(reason: SendErrReason, err: &Error) -> Self {
        let mut se = Self::new(reason);
        se.is_temp = err.is_temp();
        se.errors.push(err.to_string());
        if let Error::CommandFailed { code, status, .. } = err {
            se.error_code = Some(*code);
            se.enhanced_status = status.clone();
        }
        se
    }

    pub fn with_rcpt(mut self, rcpt: impl Into<String>) -> Self {
        self.rcpt.push(rcpt.into());
        self
    }
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client_send: {}", self.reason)?;
        if !self.errors.is_empty() {
            write!(f, ": {}", self.errors.join(", "))?;
        }
        if !self.rcpt.is_empty() {
            write!(f, ", affected recipients: {}", self.rcpt.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for SendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_4xx_is_temp() {
        let e = Error::CommandFailed {
            code: 421,
            status: Some("4.3.2".to_string()),
            text: "try again".to_string(),
        };
        assert!(e.is_temp());
    }

    #[test]
    fn command_failed_5xx_is_permanent() {
        let e = Error::CommandFailed {
            code: 550,
            status: None,
            text: "no such user".to_string(),
        };
        assert!(!e.is_temp());
    }

    #[test]
    fn send_error_carries_code_and_status() {
        let e = Error::CommandFailed {
            code: 550,
            status: Some("5.1.1".to_string()),
            text: "no such user".to_string(),
        };
        let se = SendError::from_err(SendErrReason::SmtpRcptTo, &e).with_rcpt("bad@x");
        assert_eq!(se.error_code, Some(550));
        assert_eq!(se.enhanced_status.as_deref(), Some("5.1.1"));
        assert!(!se.is_temp);
        assert_eq!(se.rcpt, vec!["bad@x".to_string()]);
        let s = se.to_string();
        assert!(s.contains("RCPT TO"));
        assert!(s.contains("bad@x"));
    }
}
