//! Dialing remote machines.

use crate::client::RemoteRobot;
use async_trait::async_trait;
use rover_config::{Credentials, RemoteConfig, TlsOptions, WebRtcOptions};
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by a dial attempt.
#[derive(Debug, Error)]
pub enum DialError {
    /// Credentials would be sent over a non-TLS channel and the runtime's
    /// policy forbids the downgrade.
    #[error("refusing to send credentials over an insecure channel")]
    InsecureCredentials,

    /// The peer could not be reached.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The peer rejected the presented credentials.
    #[error("authentication rejected: {0}")]
    AuthRejected(String),
}

/// Dial parameters assembled from a remote config plus runtime policy.
#[derive(Debug, Clone, Default)]
pub struct DialOptions {
    /// Emit verbose dial diagnostics.
    pub debug: bool,
    /// Dial without TLS.
    pub insecure: bool,
    /// Permit sending credentials over a non-TLS channel.
    pub allow_insecure_creds_downgrade: bool,
    /// Entity to authenticate as.
    pub auth_entity: Option<String>,
    /// Credentials presented to the peer. Always set explicitly (empty when
    /// the config carries none) so ambient credentials are never fed to
    /// remotes unintentionally.
    pub credentials: Option<Credentials>,
    /// External auth service to exchange credentials with.
    pub external_auth_address: Option<String>,
    /// Allow the external auth exchange over an insecure channel.
    pub external_auth_insecure: bool,
    /// TLS material overriding the runtime defaults.
    pub tls: Option<TlsOptions>,
    /// WebRTC signaling options.
    pub webrtc: Option<WebRtcOptions>,
}

impl DialOptions {
    /// Assembles dial options from a remote config and the runtime's
    /// security policy.
    #[must_use]
    pub fn from_remote(conf: &RemoteConfig, allow_insecure_creds: bool, debug: bool) -> Self {
        Self {
            debug,
            insecure: conf.insecure,
            allow_insecure_creds_downgrade: allow_insecure_creds,
            auth_entity: conf.auth.entity.clone(),
            credentials: conf.auth.credentials.clone(),
            external_auth_address: conf.auth.external_auth_address.clone(),
            external_auth_insecure: conf.auth.external_auth_insecure,
            tls: conf.tls.clone(),
            webrtc: conf.webrtc.clone(),
        }
    }
}

/// Turns a remote config into a connected peer.
///
/// The engine sees only this trait; gRPC/WebRTC/mDNS live behind it.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Dials the configured remote.
    ///
    /// # Errors
    ///
    /// Returns [`DialError::InsecureCredentials`] when the insecure-creds
    /// policy forbids the dial, and [`DialError::Unreachable`] when the peer
    /// cannot be reached.
    async fn dial(
        &self,
        conf: &RemoteConfig,
        opts: DialOptions,
    ) -> Result<Arc<dyn RemoteRobot>, DialError>;
}
