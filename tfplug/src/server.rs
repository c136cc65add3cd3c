//! Server module for running Terraform providers
//!
//! Verifies the go-plugin magic cookie, negotiates the plugin protocol with
//! the host, prints the handshake line and serves the matching gRPC adapter
//! until a shutdown signal arrives.

use crate::error::{Result, TfplugError};
use crate::grpc::v5::ProviderServiceV5;
use crate::grpc::v6::ProviderServiceV6;
use crate::grpc::ProviderServer;
use crate::proto::{tfplugin5, tfplugin6};
use crate::provider::{ProtocolVersion, Provider};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::{Identity, Server, ServerTlsConfig};

pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";
pub const PROTOCOL_VERSIONS_KEY: &str = "PLUGIN_PROTOCOL_VERSIONS";

/// go-plugin core protocol version, the first handshake field
pub const CORE_PROTOCOL_VERSION: u32 = 1;

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// PEM certificate; without it the server listens in plaintext
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    /// Maximum message size in bytes
    pub max_message_size: usize,
    /// How long in-flight requests may drain after a shutdown signal
    pub shutdown_timeout: Duration,
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cert_path: None,
            key_path: None,
            max_message_size: 256 << 20, // 256MB
            shutdown_timeout: Duration::from_secs(30),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tls(mut self, cert_path: PathBuf, key_path: PathBuf) -> Self {
        self.cert_path = Some(cert_path);
        self.key_path = Some(key_path);
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    async fn tls_config(&self) -> Result<Option<ServerTlsConfig>> {
        let (cert_path, key_path) = match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) => (cert, key),
            (None, None) => return Ok(None),
            _ => {
                return Err(TfplugError::TlsError(
                    "certificate and key must be configured together".to_string(),
                ))
            }
        };

        let cert = tokio::fs::read(cert_path)
            .await
            .map_err(|e| TfplugError::TlsError(format!("Failed to read certificate: {}", e)))?;
        let key = tokio::fs::read(key_path)
            .await
            .map_err(|e| TfplugError::TlsError(format!("Failed to read key: {}", e)))?;

        Ok(Some(
            ServerTlsConfig::new().identity(Identity::from_pem(cert, key)),
        ))
    }
}

/// True when the host launched us with the expected cookie
pub fn magic_cookie_matches(value: Option<&str>) -> bool {
    value == Some(MAGIC_COOKIE_VALUE)
}

/// Pick the highest protocol the host offers; hosts that say nothing get 6
pub fn negotiate_protocol(offered: Option<&str>) -> Option<ProtocolVersion> {
    let Some(offered) = offered.filter(|s| !s.trim().is_empty()) else {
        return Some(ProtocolVersion::V6);
    };

    offered
        .split(',')
        .filter_map(|v| v.trim().parse::<u32>().ok())
        .filter_map(ProtocolVersion::from_number)
        .max()
}

pub fn handshake_line(protocol: ProtocolVersion, addr: SocketAddr) -> String {
    format!("{}|{}|tcp|{}|grpc", CORE_PROTOCOL_VERSION, protocol, addr)
}

/// Main entry point for running a provider
pub async fn serve<P: Provider + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    if !magic_cookie_matches(std::env::var(MAGIC_COOKIE_KEY).ok().as_deref()) {
        eprintln!(
            "This binary is a plugin. These are not meant to be executed directly.\n\
             Please execute the program that consumes these plugins, which will\n\
             load any plugins automatically"
        );
        std::process::exit(1);
    }

    let offered = std::env::var(PROTOCOL_VERSIONS_KEY).ok();
    let protocol = negotiate_protocol(offered.as_deref()).ok_or_else(|| {
        TfplugError::ServerError(format!(
            "host offered no supported plugin protocol (offered {:?}, supported 5, 6)",
            offered.unwrap_or_default()
        ))
    })?;

    // an already-installed provider is fine
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let core = Arc::new(ProviderServer::new(provider));
    let mut builder = Server::builder();
    if let Some(tls) = config.tls_config().await? {
        builder = builder.tls_config(tls)?;
    }

    let router = match protocol {
        ProtocolVersion::V5 => builder.add_service(
            tfplugin5::provider_server::ProviderServer::new(ProviderServiceV5::new(core.clone()))
                .max_decoding_message_size(config.max_message_size)
                .max_encoding_message_size(config.max_message_size),
        ),
        ProtocolVersion::V6 => builder.add_service(
            tfplugin6::provider_server::ProviderServer::new(ProviderServiceV6::new(core.clone()))
                .max_decoding_message_size(config.max_message_size)
                .max_encoding_message_size(config.max_message_size),
        ),
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", handshake_line(protocol, addr))?;
    stdout.flush()?;
    tracing::info!(address = %addr, protocol = %protocol, "Provider server started");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);
    let server = router.serve_with_incoming_shutdown(incoming, async {
        let _ = shutdown_rx.await;
    });
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result?;
            return Ok(());
        }
        _ = wait_for_shutdown_signal() => {}
    }

    core.stop();
    let _ = shutdown_tx.send(());
    match tokio::time::timeout(config.shutdown_timeout, server).await {
        Ok(result) => result?,
        Err(_) => tracing::warn!(
            timeout = ?config.shutdown_timeout,
            "Shutdown timeout exceeded, forcing shutdown"
        ),
    }

    tracing::info!("Provider shutdown complete");
    Ok(())
}

/// Convenience function to run a provider with default configuration
pub async fn serve_default<P: Provider + 'static>(provider: P) -> Result<()> {
    serve(provider, ServerConfig::default()).await
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down"),
                    _ = tokio::signal::ctrl_c() => tracing::info!("Received SIGINT, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Unable to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        tracing::info!("Received CTRL+C, shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_must_match_exactly() {
        assert!(magic_cookie_matches(Some(MAGIC_COOKIE_VALUE)));
        assert!(!magic_cookie_matches(Some("nope")));
        assert!(!magic_cookie_matches(None));
    }

    #[test]
    fn highest_offered_protocol_wins() {
        assert_eq!(negotiate_protocol(Some("5,6")), Some(ProtocolVersion::V6));
        assert_eq!(negotiate_protocol(Some("5")), Some(ProtocolVersion::V5));
        assert_eq!(negotiate_protocol(Some(" 4, 5 ")), Some(ProtocolVersion::V5));
        assert_eq!(negotiate_protocol(Some("7")), None);
        assert_eq!(negotiate_protocol(None), Some(ProtocolVersion::V6));
        assert_eq!(negotiate_protocol(Some("")), Some(ProtocolVersion::V6));
    }

    #[test]
    fn handshake_format() {
        let addr: SocketAddr = "127.0.0.1:4567".parse().unwrap();
        assert_eq!(
            handshake_line(ProtocolVersion::V5, addr),
            "1|5|tcp|127.0.0.1:4567|grpc"
        );
    }

    #[test]
    fn tls_requires_both_paths() {
        let mut config = ServerConfig::new();
        config.cert_path = Some(PathBuf::from("/tmp/cert.pem"));
        let result = tokio_test::block_on(config.tls_config());
        assert!(matches!(result, Err(TfplugError::TlsError(_))));
    }
}
