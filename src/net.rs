/*
 * net.rs
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

//! TLS connection helpers: wrap TcpStream with rustls (implicit TLS,
//! STARTTLS upgrade) and expose channel-binding material for SCRAM -PLUS.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream as TokioTlsStream;
use tokio_rustls::rustls::client::ClientConfig;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::RootCertStore;
use tokio_rustls::TlsConnector;

/// Connection security negotiated with the submission server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsPolicy {
    /// Plaintext; never upgrade. For test setups only.
    NoTls,
    /// STARTTLS when the server advertises it, plaintext otherwise.
    #[default]
    Opportunistic,
    /// STARTTLS required; fail when the server does not offer it.
    Mandatory,
    /// TLS handshake immediately after connect (SMTPS, port 465).
    Implicit,
}

/// Channel-binding material exported from the TLS session (RFC 5929,
/// RFC 9266). rustls does not expose the finished messages, so tls-unique
/// is never available; tls-exporter works for TLS 1.2+ sessions with
/// extended master secret and all TLS 1.3 sessions.
#[derive(Debug, Clone, Default)]
pub struct ChannelBindings {
    pub tls_exporter: Option<Vec<u8>>,
    pub tls_unique: Option<Vec<u8>>,
}

impl ChannelBindings {
    /// Strongest available binding as `(type, data)`, exporter preferred.
    pub fn best(&self) -> Option<(&'static str, &[u8])> {
        if let Some(d) = self.tls_exporter.as_deref() {
            return Some(("tls-exporter", d));
        }
        self.tls_unique.as_deref().map(|d| ("tls-unique", d))
    }
}

/// Build a root certificate store: platform native certs first, then
/// webpki-roots as fallback.
fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    if let Ok(certs) = rustls_native_certs::load_native_certs() {
        for cert in certs {
            let _ = root_store.add(cert);
        }
    }
    if root_store.is_empty() {
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    root_store
}

/// Default TLS client config (native + Mozilla roots, no client auth).
pub fn default_client_config() -> Arc<ClientConfig> {
    let config = ClientConfig::builder()
        .with_root_certificates(build_root_store())
        .with_no_client_auth();
    Arc::new(config)
}

fn connector(config: Option<Arc<ClientConfig>>) -> TlsConnector {
    TlsConnector::from(config.unwrap_or_else(default_client_config))
}

fn server_name(host: &str) -> io::Result<ServerName<'static>> {
    ServerName::try_from(host.to_string())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid host name"))
}

/// Async TLS stream over a TcpStream.
pub struct TlsStreamWrapper {
    inner: TokioTlsStream<TcpStream>,
}

impl TlsStreamWrapper {
    /// Connect with implicit TLS (e.g. SMTPS 465): TCP connect then
    /// immediate handshake.
    pub async fn connect_implicit_tls(
        host: &str,
        port: u16,
        config: Option<Arc<ClientConfig>>,
    ) -> io::Result<Self> {
        let addr = format!("{}:{}", host, port);
        let tcp = TcpStream::connect(&addr).await?;
        let tls = connector(config)
            .connect(server_name(host)?, tcp)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))?;
        Ok(Self { inner: tls })
    }

    /// Export channel-binding material from the live session.
    pub fn channel_bindings(&self) -> ChannelBindings {
        let (_, conn) = self.inner.get_ref();
        let tls_exporter = conn
            .export_keying_material(vec![0u8; 32], b"EXPORTER-Channel-Binding", None)
            .ok();
        ChannelBindings {
            tls_exporter,
            // Not retrievable from rustls.
            tls_unique: None,
        }
    }
}

impl AsyncRead for TlsStreamWrapper {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TlsStreamWrapper {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Plain TCP stream, upgradable after STARTTLS (e.g. submission 587).
pub struct PlainStream {
    inner: TcpStream,
}

impl PlainStream {
    pub async fn connect(host: &str, port: u16) -> io::Result<Self> {
        let addr = format!("{}:{}", host, port);
        let tcp = TcpStream::connect(&addr).await?;
        Ok(Self { inner: tcp })
    }

    /// Upgrade to TLS after the server accepted STARTTLS. Consumes `self`
    /// and keeps the same TCP connection.
    pub async fn upgrade_to_tls(
        self,
        host: &str,
        config: Option<Arc<ClientConfig>>,
    ) -> io::Result<TlsStreamWrapper> {
        let tls = connector(config)
            .connect(server_name(host)?, self.inner)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))?;
        Ok(TlsStreamWrapper { inner: tls })
    }
}

impl AsyncRead for PlainStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for PlainStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Connect with implicit TLS (e.g. 465).
pub async fn connect_implicit_tls(
    host: &str,
    port: u16,
    config: Option<Arc<ClientConfig>>,
) -> io::Result<TlsStreamWrapper> {
    TlsStreamWrapper::connect_implicit_tls(host, port, config).await
}

/// Connect plain (for STARTTLS or unencrypted sessions).
pub async fn connect_plain(host: &str, port: u16) -> io::Result<PlainStream> {
    PlainStream::connect(host, port).await
}
