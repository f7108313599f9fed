//! Remote machine configuration.

use rover_resource::{ResourceConfig, ResourceError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration of a federated remote machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Name the remote's resources are prefixed with locally.
    pub name: String,
    /// Network address to dial.
    pub address: String,
    /// Authentication material for the dial.
    #[serde(default)]
    pub auth: RemoteAuth,
    /// Dial without TLS.
    #[serde(default)]
    pub insecure: bool,
    /// TLS material overriding the runtime defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsOptions>,
    /// WebRTC signaling options for NAT-traversing dials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webrtc: Option<WebRtcOptions>,
}

impl RemoteConfig {
    /// Creates a remote config with just a name and address.
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            ..Self::default()
        }
    }

    /// Validates the remote config.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::ValidationFailed`] when the name or address
    /// is empty or the name contains reserved separator characters.
    pub fn validate(&self) -> Result<(), ResourceError> {
        if self.name.is_empty() {
            return Err(ResourceError::validation_failed(
                "<unnamed remote>",
                "remote name must not be empty",
            ));
        }
        if self.name.contains(':') || self.name.contains('/') {
            return Err(ResourceError::validation_failed(
                &self.name,
                "remote name must not contain ':' or '/'",
            ));
        }
        if self.address.is_empty() {
            return Err(ResourceError::validation_failed(
                &self.name,
                "remote address must not be empty",
            ));
        }
        Ok(())
    }

    /// Embeds this remote config into a graph-node resource config so remote
    /// nodes carry their dial parameters like any other node carries
    /// attributes.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the config cannot be serialised.
    pub fn to_resource_config(&self) -> Result<ResourceConfig, ResourceError> {
        let value = serde_json::to_value(self).map_err(|err| {
            ResourceError::validation_failed(&self.name, format!("remote config: {err}"))
        })?;
        let serde_json::Value::Object(attributes) = value else {
            return Err(ResourceError::validation_failed(
                &self.name,
                "remote config did not serialise to an object",
            ));
        };
        let mut conf = ResourceConfig::new(
            rover_resource::Api::remote(),
            rover_resource::Model::builtin(),
            self.name.clone(),
        );
        conf.attributes = attributes;
        Ok(conf)
    }

    /// Recovers a remote config embedded by
    /// [`RemoteConfig::to_resource_config`].
    ///
    /// # Errors
    ///
    /// Returns a validation error if the attributes do not describe a remote
    /// config.
    pub fn from_resource_config(conf: &ResourceConfig) -> Result<Self, ResourceError> {
        serde_json::from_value(serde_json::Value::Object(conf.attributes.clone())).map_err(|err| {
            ResourceError::validation_failed(&conf.name, format!("remote config: {err}"))
        })
    }
}

/// Authentication material for dialing a remote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteAuth {
    /// Entity to authenticate as, when credentials are entity-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Credentials presented to the remote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    /// Address of an external auth service to exchange credentials with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_auth_address: Option<String>,
    /// Allow the external auth exchange over an insecure channel.
    #[serde(default)]
    pub external_auth_insecure: bool,
}

/// A typed credential payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    /// Credential type tag, e.g. `api-key`.
    pub kind: String,
    /// Opaque credential payload.
    pub payload: String,
}

/// TLS material for a remote dial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TlsOptions {
    /// Path to a CA bundle to trust.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_path: Option<PathBuf>,
    /// Path to the client certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_path: Option<PathBuf>,
    /// Path to the client private key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,
    /// Expected server name, overriding the dialed host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
}

/// WebRTC signaling options for a remote dial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebRtcOptions {
    /// Disable WebRTC and force a direct connection.
    #[serde(default)]
    pub disable: bool,
    /// Signaling server address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signaling_server_address: Option<String>,
    /// Entity to authenticate as against the signaling server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signaling_auth_entity: Option<String>,
}
