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

//! High-level submission client: dial, TLS policy, auth selection, the
//! per-message MAIL/RCPT/DATA transaction, error classification and
//! connection reuse across sends.

use std::sync::Arc;
use std::time::Duration;

use tokio_rustls::rustls::client::ClientConfig;

use crate::error::{Error, SendErrReason, SendError};
use crate::mime::Encoding;
use crate::msg::Msg;
use crate::net::{connect_implicit_tls, connect_plain, TlsPolicy};
use crate::sasl::{discover_mechanism, SaslError, SmtpAuthType};
use crate::smtp::{SmtpConnection, SmtpSession};

/// Default submission port (RFC 6409).
pub const DEFAULT_PORT: u16 = 587;

/// Default per-operation deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// What the DSN should return for failed deliveries (RFC 1891 RET).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DsnMailReturn {
    /// RET=FULL: the full message.
    Full,
    /// RET=HDRS: headers only.
    HeadersOnly,
}

impl DsnMailReturn {
    fn as_str(&self) -> &'static str {
        match self {
            DsnMailReturn::Full => "FULL",
            DsnMailReturn::HeadersOnly => "HDRS",
        }
    }
}

/// Delivery events the server should notify about (RFC 1891 NOTIFY).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DsnNotify {
    Never,
    Success,
    Failure,
    Delay,
}

impl DsnNotify {
    fn as_str(&self) -> &'static str {
        match self {
            DsnNotify::Never => "NEVER",
            DsnNotify::Success => "SUCCESS",
            DsnNotify::Failure => "FAILURE",
            DsnNotify::Delay => "DELAY",
        }
    }
}

#[derive(Debug, Clone)]
struct DsnConfig {
    return_type: DsnMailReturn,
    notify: Vec<DsnNotify>,
}

/// SMTP submission client. One transaction at a time; the connection is
/// kept open across [`send`](Client::send) calls and redialed when dead.
pub struct Client {
    host: String,
    port: u16,
    timeout: Duration,
    tls_policy: TlsPolicy,
    tls_policy_set: bool,
    tls_config: Option<Arc<ClientConfig>>,
    hello_host: String,
    auth_type: Option<SmtpAuthType>,
    username: Option<String>,
    password: Option<String>,
    dsn: Option<DsnConfig>,
    connection: Option<SmtpConnection>,
}

impl Client {
    pub fn new(host: impl Into<String>) -> Self {
        let hello_host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".to_string());
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            tls_policy: TlsPolicy::default(),
            tls_policy_set: false,
            tls_config: None,
            hello_host,
            auth_type: None,
            username: None,
            password: None,
            dsn: None,
            connection: None,
        }
    }

    /// Set the server port. 465 implies implicit TLS unless a policy was
    /// chosen explicitly.
    pub fn set_port(&mut self, port: u16) -> &mut Self {
        self.port = port;
        if port == 465 && !self.tls_policy_set {
            self.tls_policy = TlsPolicy::Implicit;
        }
        self
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    pub fn set_tls_policy(&mut self, policy: TlsPolicy) -> &mut Self {
        self.tls_policy = policy;
        self.tls_policy_set = true;
        self
    }

    /// Inject a rustls client config (custom roots, test certificates).
    pub fn set_tls_config(&mut self, config: Arc<ClientConfig>) -> &mut Self {
        self.tls_config = Some(config);
        self
    }

    /// Name announced in EHLO/HELO. Defaults to the local hostname.
    pub fn set_hello_host(&mut self, name: impl Into<String>) -> &mut Self {
        self.hello_host = name.into();
        self
    }

    pub fn set_smtp_auth(&mut self, auth: SmtpAuthType) -> &mut Self {
        self.auth_type = Some(auth);
        self
    }

    pub fn set_username(&mut self, username: impl Into<String>) -> &mut Self {
        self.username = Some(username.into());
        self
    }

    pub fn set_password(&mut self, password: impl Into<String>) -> &mut Self {
        self.password = Some(password.into());
        self
    }

    /// Request delivery status notifications with the given return type
    /// and notify set. Applied only when the server advertises DSN.
    pub fn set_dsn(&mut self, return_type: DsnMailReturn, notify: Vec<DsnNotify>) -> &mut Self {
        self.dsn = Some(DsnConfig {
            return_type,
            notify,
        });
        self
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Server capabilities from the current session's EHLO reply.
    pub fn server_supports(&self, keyword: &str) -> bool {
        self.connection
            .as_ref()
            .map(|c| c.supports(keyword))
            .unwrap_or(false)
    }

    /// Connect, greet, EHLO, negotiate TLS per policy and authenticate.
    pub async fn dial(&mut self) -> Result<(), Error> {
        let mut conn = match self.tls_policy {
            TlsPolicy::Implicit => {
                let stream = connect_implicit_tls(&self.host, self.port, self.tls_config.clone())
                    .await
                    .map_err(|e| Error::ConnectionFailed(e.to_string()))?;
                let cb = stream.channel_bindings();
                let mut session = SmtpSession::new(stream, true, self.timeout);
                session.set_channel_bindings(cb);
                session.greeting().await?;
                session.ehlo(&self.hello_host).await?;
                SmtpConnection::Tls(session)
            }
            _ => {
                let stream = connect_plain(&self.host, self.port)
                    .await
                    .map_err(|e| Error::ConnectionFailed(e.to_string()))?;
                let mut session = SmtpSession::new(stream, false, self.timeout);
                session.greeting().await?;
                session.ehlo(&self.hello_host).await?;
                let wants_tls = matches!(
                    self.tls_policy,
                    TlsPolicy::Opportunistic | TlsPolicy::Mandatory
                );
                if wants_tls && session.supports("STARTTLS") {
                    let mut tls = session
                        .starttls(&self.host, self.tls_config.clone())
                        .await?;
                    tls.ehlo(&self.hello_host).await?;
                    SmtpConnection::Tls(tls)
                } else if self.tls_policy == TlsPolicy::Mandatory {
                    return Err(Error::TlsRequired);
                } else {
                    SmtpConnection::Plain(session)
                }
            }
        };

        if let Some(auth) = self.auth_type {
            let username = self.username.clone().unwrap_or_default();
            let password = self.password.clone().unwrap_or_default();
            if username.is_empty() {
                return Err(Error::Auth(SaslError::Failed(
                    "no username configured".to_string(),
                )));
            }
            let mechanism = if auth == SmtpAuthType::AutoDiscover {
                discover_mechanism(
                    &conn.advertised_auth(),
                    conn.is_tls(),
                    conn.has_channel_binding(),
                )
                .ok_or(Error::NoSupportedAuth)?
            } else {
                auth
            };
            conn.auth(mechanism, &username, &password).await?;
        }

        self.connection = Some(conn);
        Ok(())
    }

    /// Probe the connection with NOOP; redial when dead or absent.
    async fn ensure_alive(&mut self) -> Result<(), Error> {
        if let Some(conn) = self.connection.as_mut() {
            if conn.noop().await.is_ok() {
                return Ok(());
            }
            self.connection = None;
        }
        self.dial().await
    }

    fn mail_params(&self, msg: &Msg, conn: &SmtpConnection) -> String {
        let mut params = String::new();
        if msg.encoding() == Encoding::NoEncoding && conn.supports("8BITMIME") {
            params.push_str(" BODY=8BITMIME");
        }
        if let Some(dsn) = &self.dsn {
            if conn.supports("DSN") {
                params.push_str(&format!(" RET={}", dsn.return_type.as_str()));
            }
        }
        params
    }

    fn rcpt_params(&self, conn: &SmtpConnection) -> String {
        match &self.dsn {
            Some(dsn) if conn.supports("DSN") && !dsn.notify.is_empty() => {
                let list = dsn
                    .notify
                    .iter()
                    .map(|n| n.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                format!(" NOTIFY={}", list)
            }
            _ => String::new(),
        }
    }

    /// Run one MAIL/RCPT/DATA transaction for `msg`. Marks the delivered
    /// flag on success; a partial RCPT failure still delivers to the
    /// accepted recipients and reports the rejected ones. On a transport
    /// failure the connection is dropped so the next send redials.
    async fn send_single(&mut self, msg: &mut Msg) -> Result<(), SendError> {
        let mut conn = self
            .connection
            .take()
            .expect("send_single runs with a live connection");
        let mail_params = self.mail_params(msg, &conn);
        let rcpt_params = self.rcpt_params(&conn);
        let mut conn_dead = false;
        let result = transact(&mut conn, msg, &mail_params, &rcpt_params, &mut conn_dead).await;
        if !conn_dead {
            self.connection = Some(conn);
        }
        result
    }

    /// Send all messages in order over the active (or redialed) session.
    /// Per-message errors are recorded on each Msg; the aggregate error is
    /// the single failure, or an `ambiguous` composite for several.
    pub async fn send(&mut self, msgs: &mut [Msg]) -> Result<(), SendError> {
        if msgs.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.ensure_alive().await {
            let se = SendError::from_err(SendErrReason::ConnCheck, &e);
            for msg in msgs.iter_mut() {
                msg.set_send_error(Some(se.clone()));
            }
            return Err(se);
        }

        let mut errors: Vec<SendError> = Vec::new();
        let count = msgs.len();
        for i in 0..count {
            let msg = &mut msgs[i];
            msg.set_delivered(false);
            match self.send_single(msg).await {
                Ok(()) => msg.set_send_error(None),
                Err(se) => {
                    msg.set_send_error(Some(se.clone()));
                    errors.push(se);
                }
            }
            // Clear the transaction and re-check the session before the
            // next message.
            if i + 1 < count {
                if let Some(conn) = self.connection.as_mut() {
                    if conn.rset().await.is_err() {
                        self.connection = None;
                    }
                }
                if self.connection.is_none() {
                    if let Err(e) = self.ensure_alive().await {
                        let se = SendError::from_err(SendErrReason::ConnCheck, &e);
                        errors.push(se.clone());
                        for rest in msgs[i + 1..].iter_mut() {
                            rest.set_send_error(Some(se.clone()));
                        }
                        break;
                    }
                }
            } else if let Some(conn) = self.connection.as_mut() {
                let _ = conn.rset().await;
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => {
                let mut agg = SendError::new(SendErrReason::Ambiguous);
                agg.is_temp = errors.last().map(|e| e.is_temp).unwrap_or(false);
                for e in &errors {
                    agg.errors.extend(e.errors.iter().cloned());
                    for r in &e.rcpt {
                        if !agg.rcpt.contains(r) {
                            agg.rcpt.push(r.clone());
                        }
                    }
                }
                Err(agg)
            }
        }
    }

    /// Dial if needed, send, and keep the connection open for reuse.
    pub async fn dial_and_send(&mut self, msgs: &mut [Msg]) -> Result<(), Error> {
        if !self.is_connected() {
            self.dial().await?;
        }
        self.send(msgs).await?;
        Ok(())
    }

    /// Issue RSET on the active session.
    pub async fn reset(&mut self) -> Result<(), Error> {
        match self.connection.as_mut() {
            Some(conn) => {
                conn.rset().await?;
                Ok(())
            }
            None => Err(Error::ConnectionFailed("no active connection".to_string())),
        }
    }

    /// QUIT and drop the session.
    pub async fn close(&mut self) -> Result<(), Error> {
        if let Some(mut conn) = self.connection.take() {
            conn.quit().await?;
        }
        Ok(())
    }
}

/// True for failures that leave the session unusable.
fn is_conn_fatal(err: &Error) -> bool {
    matches!(err, Error::Io(_) | Error::Timeout)
}

/// The MAIL/RCPT/DATA flow against an established connection. Sets
/// `conn_dead` when the transport broke so the caller drops the session.
async fn transact(
    conn: &mut SmtpConnection,
    msg: &mut Msg,
    mail_params: &str,
    rcpt_params: &str,
    conn_dead: &mut bool,
) -> Result<(), SendError> {
    if msg.encoding() == Encoding::NoEncoding && !conn.supports("8BITMIME") {
        return Err(SendError::new(SendErrReason::NoUnencoded));
    }

    let sender = msg
        .get_sender(true)
        .map_err(|e| SendError::from_err(SendErrReason::GetSender, &e))?;
    let rcpts = msg
        .get_recipients()
        .map_err(|e| SendError::from_err(SendErrReason::GetRcpts, &e))?;

    if let Err(e) = conn.mail_from(&sender, mail_params).await {
        let se = SendError::from_err(SendErrReason::SmtpMailFrom, &e);
        if is_conn_fatal(&e) {
            *conn_dead = true;
        } else {
            let _ = conn.rset().await;
        }
        return Err(se);
    }

    let mut rcpt_err: Option<SendError> = None;
    let mut accepted = 0usize;
    for rcpt in &rcpts {
        match conn.rcpt_to(rcpt, rcpt_params).await {
            Ok(_) => accepted += 1,
            Err(e) => {
                match rcpt_err.as_mut() {
                    Some(se) => {
                        se.errors.push(e.to_string());
                        se.rcpt.push(rcpt.clone());
                    }
                    None => {
                        rcpt_err = Some(
                            SendError::from_err(SendErrReason::SmtpRcptTo, &e)
                                .with_rcpt(rcpt.clone()),
                        );
                    }
                }
                if is_conn_fatal(&e) {
                    *conn_dead = true;
                    return Err(rcpt_err.unwrap());
                }
            }
        }
    }
    if accepted == 0 {
        let _ = conn.rset().await;
        return Err(rcpt_err.unwrap_or_else(|| SendError::new(SendErrReason::SmtpRcptTo)));
    }

    let content = msg
        .to_bytes()
        .map_err(|e| SendError::from_err(SendErrReason::WriteContent, &e))?;
    if let Err((reason, e)) = conn.transmit_data(&content).await {
        let se = SendError::from_err(reason, &e);
        if is_conn_fatal(&e) {
            *conn_dead = true;
        } else {
            let _ = conn.rset().await;
        }
        return Err(se);
    }
    msg.set_delivered(true);

    // Partial RCPT rejections are reported even though the message went
    // out to the accepted recipients.
    match rcpt_err {
        Some(se) => Err(se),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Client::new("mail.example.com");
        assert_eq!(c.port, DEFAULT_PORT);
        assert_eq!(c.timeout, DEFAULT_TIMEOUT);
        assert_eq!(c.tls_policy, TlsPolicy::Opportunistic);
        assert!(!c.is_connected());
    }

    #[test]
    fn port_465_implies_implicit_tls() {
        let mut c = Client::new("mail.example.com");
        c.set_port(465);
        assert_eq!(c.tls_policy, TlsPolicy::Implicit);
    }

    #[test]
    fn explicit_policy_wins_over_port() {
        let mut c = Client::new("mail.example.com");
        c.set_tls_policy(TlsPolicy::Mandatory);
        c.set_port(465);
        assert_eq!(c.tls_policy, TlsPolicy::Mandatory);
    }

    #[test]
    fn dsn_param_strings() {
        assert_eq!(DsnMailReturn::Full.as_str(), "FULL");
        assert_eq!(DsnMailReturn::HeadersOnly.as_str(), "HDRS");
        assert_eq!(DsnNotify::Failure.as_str(), "FAILURE");
    }
}
