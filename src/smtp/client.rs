/*
 * client.rs
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

//! Line-level SMTP protocol: command/response exchange, multi-line replies,
//! EHLO extension map, STARTTLS upgrade, SASL exchange, transaction
//! commands and the dot-stuffed DATA writer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_rustls::rustls::client::ClientConfig;

use crate::error::Error;
use crate::net::{ChannelBindings, PlainStream, TlsStreamWrapper};
use crate::sasl::{
    self, cram_md5_response, login_response, plain_initial_response, xoauth2_initial_response,
    SaslError, ScramState, SmtpAuthType,
};
use crate::smtp::dot_stuffer::DotStuffer;

/// Parsed SMTP reply: 3-digit code, optional RFC 2034 enhanced status code
/// and the reply text (multi-line replies joined with CRLF).
#[derive(Debug, Clone)]
pub struct Response {
    pub code: u16,
    pub enhanced_status: Option<String>,
    pub lines: Vec<String>,
}

impl Response {
    /// Reply text; multi-line replies concatenated with CRLF.
    pub fn message(&self) -> String {
        self.lines.join("\r\n")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent(&self) -> bool {
        self.code >= 500
    }
}

/// True for a valid RFC 2034 status code: digit '.' digits '.' digits.
fn is_enhanced_status(token: &str) -> bool {
    let fields: Vec<&str> = token.split('.').collect();
    fields.len() == 3
        && fields
            .iter()
            .all(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
        && fields[0].len() == 1
        && matches!(fields[0], "2" | "4" | "5")
}

/// One SMTP session over a plain or TLS stream. Created from the greeting
/// onward by the high-level [`Client`](crate::client::Client).
pub struct SmtpSession<S> {
    stream: S,
    read_buf: Vec<u8>,
    extensions: HashMap<String, String>,
    is_tls: bool,
    channel_bindings: Option<ChannelBindings>,
    deadline: Duration,
}

impl<S: AsyncRead + AsyncWrite + Unpin> SmtpSession<S> {
    pub fn new(stream: S, is_tls: bool, deadline: Duration) -> Self {
        Self {
            stream,
            read_buf: Vec::with_capacity(1024),
            extensions: HashMap::new(),
            is_tls,
            channel_bindings: None,
            deadline,
        }
    }

    pub fn is_tls(&self) -> bool {
        self.is_tls
    }

    pub fn set_channel_bindings(&mut self, cb: ChannelBindings) {
        self.channel_bindings = Some(cb);
    }

    /// True when channel-binding material is available for SCRAM -PLUS.
    pub fn has_channel_binding(&self) -> bool {
        self.channel_bindings
            .as_ref()
            .and_then(|cb| cb.best())
            .is_some()
    }

    /// Extension map parsed from the last EHLO reply. Keys are uppercased
    /// keywords, values the parameter remainder.
    pub fn extensions(&self) -> &HashMap<String, String> {
        &self.extensions
    }

    pub fn supports(&self, keyword: &str) -> bool {
        self.extensions.contains_key(keyword)
    }

    pub fn ext_param(&self, keyword: &str) -> Option<&str> {
        self.extensions.get(keyword).map(|s| s.as_str())
    }

    async fn write_all_timed(&mut self, bytes: &[u8]) -> Result<(), Error> {
        timeout(self.deadline, async {
            self.stream.write_all(bytes).await?;
            self.stream.flush().await
        })
        .await
        .map_err(|_| Error::Timeout)??;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, Error> {
        loop {
            if let Some(pos) = self
                .read_buf
                .windows(2)
                .position(|w| w == b"\r\n")
            {
                let line: Vec<u8> = self.read_buf.drain(..pos + 2).collect();
                return Ok(String::from_utf8_lossy(&line[..line.len() - 2]).into_owned());
            }
            let mut chunk = [0u8; 512];
            let n = timeout(self.deadline, self.stream.read(&mut chunk))
                .await
                .map_err(|_| Error::Timeout)??;
            if n == 0 {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }
            self.read_buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Read one reply (single or multi-line). The enhanced status code is
    /// parsed only when the server advertised ENHANCEDSTATUSCODES.
    pub async fn read_response(&mut self) -> Result<Response, Error> {
        let mut lines = Vec::new();
        let mut code = 0u16;
        loop {
            let line = self.read_line().await?;
            log::trace!("S: {}", line);
            let code_str = match line.get(..3) {
                Some(s) if s.bytes().all(|b| b.is_ascii_digit()) => s,
                _ => continue,
            };
            code = code_str.parse().unwrap_or(0);
            let continuation = line.as_bytes().get(3) == Some(&b'-');
            let text = line.get(4..).unwrap_or("");
            lines.push(text.to_string());
            if !continuation {
                break;
            }
        }
        let mut enhanced_status = None;
        if self.supports("ENHANCEDSTATUSCODES") {
            if let Some(first) = lines.first() {
                if let Some(token) = first.split_whitespace().next() {
                    if is_enhanced_status(token) {
                        let status = token.to_string();
                        for line in &mut lines {
                            if let Some(rest) = line.strip_prefix(status.as_str()) {
                                *line = rest.trim_start().to_string();
                            }
                        }
                        enhanced_status = Some(status);
                    }
                }
            }
        }
        Ok(Response {
            code,
            enhanced_status,
            lines,
        })
    }

    /// Send one command line and read the reply.
    pub async fn cmd(&mut self, command: &str) -> Result<Response, Error> {
        if let Some(rest) = command.strip_prefix("AUTH ") {
            let mech = rest.split_whitespace().next().unwrap_or("");
            log::trace!("C: AUTH {} ****", mech);
        } else {
            log::trace!("C: {}", command);
        }
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        self.write_all_timed(&line).await?;
        self.read_response().await
    }

    fn check(&self, resp: Response, expected: &[u16]) -> Result<Response, Error> {
        if expected.contains(&resp.code) {
            Ok(resp)
        } else {
            Err(Error::CommandFailed {
                code: resp.code,
                status: resp.enhanced_status.clone(),
                text: resp.message(),
            })
        }
    }

    /// Read and check the 220 greeting. Must be the first exchange.
    pub async fn greeting(&mut self) -> Result<(), Error> {
        let r = self
            .read_response()
            .await
            .map_err(|e| Error::GreetingFailed(e.to_string()))?;
        if r.code != 220 {
            return Err(Error::GreetingFailed(format!("{} {}", r.code, r.message())));
        }
        Ok(())
    }

    /// EHLO with HELO fallback on a 5xx reply. Replaces the extension map;
    /// after a HELO fallback the map is empty.
    pub async fn ehlo(&mut self, name: &str) -> Result<(), Error> {
        let r = self.cmd(&format!("EHLO {}", name)).await?;
        if r.is_success() {
            self.extensions = parse_ehlo_reply(&r.lines);
            return Ok(());
        }
        if r.is_permanent() {
            let r = self.cmd(&format!("HELO {}", name)).await?;
            if r.is_success() {
                self.extensions = HashMap::new();
                return Ok(());
            }
            return Err(Error::EhloFailed(format!("{} {}", r.code, r.message())));
        }
        Err(Error::EhloFailed(format!("{} {}", r.code, r.message())))
    }

    /// Mechanism names from the AUTH extension parameter, uppercased.
    pub fn advertised_auth(&self) -> Vec<String> {
        self.ext_param("AUTH")
            .map(|p| p.split_whitespace().map(|m| m.to_uppercase()).collect())
            .unwrap_or_default()
    }

    /// Drive the SASL exchange for the chosen mechanism. Preconditions
    /// (server support, TLS state, channel binding availability) are
    /// enforced before the first command.
    pub async fn auth(
        &mut self,
        mechanism: SmtpAuthType,
        username: &str,
        password: &str,
    ) -> Result<(), Error> {
        if !self
            .advertised_auth()
            .iter()
            .any(|m| m == mechanism.wire_name())
        {
            return Err(Error::AuthMechanismUnsupported(
                mechanism.wire_name().to_string(),
            ));
        }
        if mechanism.requires_tls() && !self.is_tls {
            return Err(Error::Auth(SaslError::TlsRequired(mechanism.wire_name())));
        }

        let channel_binding = if mechanism.uses_channel_binding() {
            let cb = self
                .channel_bindings
                .as_ref()
                .and_then(|cb| cb.best())
                .map(|(kind, data)| (kind, data.to_vec()));
            match cb {
                Some(cb) => Some(cb),
                None => return Err(Error::Auth(SaslError::ChannelBindingUnavailable)),
            }
        } else {
            None
        };

        let mut scram_state: Option<ScramState> = None;
        let mut scram_verified = false;
        let mut login_prompts = 0usize;

        let initial: Option<Vec<u8>> = match mechanism {
            SmtpAuthType::Plain | SmtpAuthType::PlainNoEnc => {
                Some(plain_initial_response("", username, password))
            }
            SmtpAuthType::XOAuth2 => Some(xoauth2_initial_response(username, password)),
            SmtpAuthType::Login | SmtpAuthType::LoginNoEnc | SmtpAuthType::CramMd5 => None,
            m if m.is_scram() => {
                let hash = m.scram_hash().expect("scram mechanism has a hash");
                let cb = channel_binding
                    .as_ref()
                    .map(|(kind, data)| (*kind, data.as_slice()));
                let (first, state) = sasl::client_first(hash, username, cb);
                scram_state = Some(state);
                Some(first)
            }
            SmtpAuthType::AutoDiscover => {
                return Err(Error::NoSupportedAuth);
            }
            _ => None,
        };

        let command = match initial {
            Some(payload) => format!(
                "AUTH {} {}",
                mechanism.wire_name(),
                STANDARD.encode(payload)
            ),
            None => format!("AUTH {}", mechanism.wire_name()),
        };
        let mut resp = self.cmd(&command).await?;

        loop {
            match resp.code {
                235 => {
                    log::debug!("authenticated via {}", mechanism.wire_name());
                    return Ok(());
                }
                334 => {
                    let challenge = STANDARD
                        .decode(resp.message().trim().as_bytes())
                        .map_err(|_| {
                            Error::Auth(SaslError::invalid("challenge is not valid base64"))
                        })?;
                    let reply: Vec<u8> = match mechanism {
                        SmtpAuthType::Login | SmtpAuthType::LoginNoEnc => {
                            let prompt = String::from_utf8_lossy(&challenge).into_owned();
                            let r = login_response(&prompt, username, password, login_prompts);
                            login_prompts += 1;
                            r
                        }
                        SmtpAuthType::CramMd5 => {
                            cram_md5_response(username, password, &challenge)
                        }
                        m if m.is_scram() => {
                            let state = scram_state
                                .as_mut()
                                .ok_or_else(|| Error::Auth(SaslError::invalid("missing SCRAM state")))?;
                            let text = String::from_utf8_lossy(&challenge).into_owned();
                            if !scram_verified {
                                if state.awaiting_server_final() {
                                    sasl::verify_server_final(state, &text)
                                        .map_err(Error::Auth)?;
                                    scram_verified = true;
                                    Vec::new()
                                } else {
                                    sasl::client_final(state, &text, password)
                                        .map_err(Error::Auth)?
                                }
                            } else {
                                return Err(Error::Auth(SaslError::invalid(
                                    "unexpected challenge after server-final",
                                )));
                            }
                        }
                        // PLAIN/XOAUTH2 already sent everything; an extra
                        // challenge carries an error blob, answer empty to
                        // collect the final reply.
                        _ => Vec::new(),
                    };
                    let encoded = STANDARD.encode(reply);
                    log::trace!("C: ****");
                    let mut line = encoded.into_bytes();
                    line.extend_from_slice(b"\r\n");
                    self.write_all_timed(&line).await?;
                    resp = self.read_response().await?;
                }
                _ => {
                    return Err(Error::Auth(SaslError::Failed(format!(
                        "{} {}",
                        resp.code,
                        resp.message()
                    ))));
                }
            }
        }
    }

    pub async fn mail_from(&mut self, addr: &str, params: &str) -> Result<Response, Error> {
        let r = self
            .cmd(&format!("MAIL FROM:<{}>{}", addr, params))
            .await?;
        self.check(r, &[250])
    }

    /// 251 (forwarded) and 252 (cannot verify) count as acceptance.
    pub async fn rcpt_to(&mut self, addr: &str, params: &str) -> Result<Response, Error> {
        let r = self.cmd(&format!("RCPT TO:<{}>{}", addr, params)).await?;
        self.check(r, &[250, 251, 252])
    }

    /// Issue DATA and return the scoped dot-stuffing writer after 354.
    pub async fn data(&mut self) -> Result<DataWriter<'_, S>, Error> {
        let r = self.cmd("DATA").await?;
        self.check(r, &[354])?;
        Ok(DataWriter {
            session: self,
            stuffer: DotStuffer::new(),
        })
    }

    /// DATA, stream `content`, close. Returns the final 250 reply.
    pub async fn send_data(&mut self, content: &[u8]) -> Result<Response, Error> {
        let mut w = self.data().await?;
        w.write_all(content).await?;
        w.close().await
    }

    pub async fn rset(&mut self) -> Result<Response, Error> {
        let r = self.cmd("RSET").await?;
        self.check(r, &[250])
    }

    pub async fn noop(&mut self) -> Result<Response, Error> {
        let r = self.cmd("NOOP").await?;
        self.check(r, &[250])
    }

    pub async fn vrfy(&mut self, addr: &str) -> Result<Response, Error> {
        let r = self.cmd(&format!("VRFY {}", addr)).await?;
        self.check(r, &[250, 251, 252])
    }

    /// QUIT; the reply is read best-effort.
    pub async fn quit(&mut self) -> Result<(), Error> {
        let _ = self.cmd("QUIT").await?;
        Ok(())
    }
}

impl SmtpSession<PlainStream> {
    /// STARTTLS: 220, TLS handshake on the same socket, fresh session state.
    /// The caller must re-issue EHLO; the old extension map is dropped.
    pub async fn starttls(
        mut self,
        host: &str,
        config: Option<Arc<ClientConfig>>,
    ) -> Result<SmtpSession<TlsStreamWrapper>, Error> {
        let r = self.cmd("STARTTLS").await?;
        if r.code != 220 {
            return Err(Error::StartTlsFailed(format!("{} {}", r.code, r.message())));
        }
        let tls = self
            .stream
            .upgrade_to_tls(host, config)
            .await
            .map_err(|e| Error::TlsHandshake(e.to_string()))?;
        let mut session = SmtpSession::new(tls, true, self.deadline);
        let cb = session.stream.channel_bindings();
        session.set_channel_bindings(cb);
        Ok(session)
    }
}

/// Scoped DATA sink: dot-stuffs every chunk; closing writes the
/// `CRLF . CRLF` terminator and reads the server's final reply.
pub struct DataWriter<'a, S> {
    session: &'a mut SmtpSession<S>,
    stuffer: DotStuffer,
}

impl<S: AsyncRead + AsyncWrite + Unpin> DataWriter<'_, S> {
    pub async fn write_all(&mut self, chunk: &[u8]) -> Result<(), Error> {
        let mut buf = Vec::with_capacity(chunk.len() + 16);
        self.stuffer.stuff_into(chunk, &mut buf);
        self.session.write_all_timed(&buf).await
    }

    /// Terminate the data stream and return the final reply (250 on
    /// acceptance; 4xx/5xx surface as `CommandFailed`).
    pub async fn close(mut self) -> Result<Response, Error> {
        let mut buf = Vec::with_capacity(8);
        self.stuffer.finish_into(&mut buf);
        self.session.write_all_timed(&buf).await?;
        let r = self.session.read_response().await?;
        if r.is_success() {
            Ok(r)
        } else {
            Err(Error::CommandFailed {
                code: r.code,
                status: r.enhanced_status.clone(),
                text: r.message(),
            })
        }
    }
}

/// Parse EHLO reply lines into the extension map. The first line is the
/// server's greeting text and carries no keyword.
fn parse_ehlo_reply(lines: &[String]) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for line in lines.iter().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once(' ') {
            Some((kw, params)) => {
                out.insert(kw.to_uppercase(), params.trim().to_string());
            }
            None => {
                out.insert(line.to_uppercase(), String::new());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ehlo_reply_parsing() {
        let lines: Vec<String> = [
            "mail.example.com greets you",
            "STARTTLS",
            "AUTH PLAIN LOGIN SCRAM-SHA-256",
            "SIZE 35882577",
            "8BITMIME",
            "ENHANCEDSTATUSCODES",
            "DSN",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let map = parse_ehlo_reply(&lines);
        assert!(map.contains_key("STARTTLS"));
        assert!(map.contains_key("8BITMIME"));
        assert!(map.contains_key("DSN"));
        assert_eq!(map.get("SIZE").map(String::as_str), Some("35882577"));
        assert_eq!(
            map.get("AUTH").map(String::as_str),
            Some("PLAIN LOGIN SCRAM-SHA-256")
        );
        assert!(!map.contains_key("MAIL.EXAMPLE.COM"));
    }

    #[test]
    fn enhanced_status_token_detection() {
        assert!(is_enhanced_status("5.1.1"));
        assert!(is_enhanced_status("2.0.0"));
        assert!(is_enhanced_status("4.7.230"));
        assert!(!is_enhanced_status("250"));
        assert!(!is_enhanced_status("5.1"));
        assert!(!is_enhanced_status("5.1.x"));
        assert!(!is_enhanced_status("10.1.1"));
        assert!(!is_enhanced_status("3.1.1"));
    }

    #[test]
    fn response_classification() {
        let ok = Response {
            code: 250,
            enhanced_status: None,
            lines: vec!["OK".into()],
        };
        assert!(ok.is_success() && !ok.is_transient() && !ok.is_permanent());
        let tmp = Response {
            code: 421,
            enhanced_status: None,
            lines: vec![],
        };
        assert!(tmp.is_transient());
        let perm = Response {
            code: 550,
            enhanced_status: None,
            lines: vec![],
        };
        assert!(perm.is_permanent());
    }

    #[test]
    fn multiline_message_joined_with_crlf() {
        let r = Response {
            code: 250,
            enhanced_status: None,
            lines: vec!["first".into(), "second".into()],
        };
        assert_eq!(r.message(), "first\r\nsecond");
    }
}
