use std::net::SocketAddr;
use std::time::Duration;

use async_ssh2_tokio::client::{AuthMethod, Client, ServerCheckMethod};
use tokio::fs;
use tracing::debug;

use crate::errors::SshError;
use crate::errors::TransientNetworkError;

/// A single live SSH session to one host. Owned by the per-host slot in
/// [`crate::ssh::SshExecutor`]'s connection map.
pub struct SshConnection {
    client: Client,
    host: String,
}

impl SshConnection {
    pub async fn connect(
        host: &str,
        username: &str,
        key_path: &str,
        connect_timeout: Duration,
    ) -> Result<Self, SshError> {
        debug!(%host, %username, "establishing SSH connection");

        let addr: SocketAddr = if host.contains(':') {
            host.parse().map_err(|_| SshError::AuthFailed {
                host: host.to_string(),
                reason: "unparsable host address".into(),
            })?
        } else {
            format!("{}:22", host).parse().map_err(|_| SshError::AuthFailed {
                host: host.to_string(),
                reason: "unparsable host address".into(),
            })?
        };

        let key_content = fs::read_to_string(key_path)
            .await
            .map_err(|e| SshError::KeyPreflightFailed {
                path: key_path.to_string(),
                reason: e.to_string(),
            })?;

        let auth_method = AuthMethod::with_key(&key_content, None);

        let client = tokio::time::timeout(
            connect_timeout,
            Client::connect(addr, username, auth_method, ServerCheckMethod::NoCheck),
        )
        .await
        .map_err(|_| SshError::Transient(TransientNetworkError::SshTimeout { host: host.to_string() }))?
        .map_err(|e| SshError::Transient(TransientNetworkError::SshChannelFailed {
            host: host.to_string(),
            reason: e.to_string(),
        }))?;

        Ok(SshConnection {
            client,
            host: host.to_string(),
        })
    }

    pub async fn execute(&mut self, command: &str) -> Result<(String, String, i32), SshError> {
        let result = self
            .client
            .execute(command)
            .await
            .map_err(|e| SshError::Transient(TransientNetworkError::SshChannelFailed {
                host: self.host.clone(),
                reason: e.to_string(),
            }))?;

        Ok((result.stdout, result.stderr, result.exit_status as i32))
    }
}

/// Verifies a private key file exists and carries exactly mode 0600.
/// Run once per key path at startup; failure aborts startup rather than
/// being retried, since a key with the wrong permissions never heals itself.
#[cfg(unix)]
pub async fn preflight_key(path: &str) -> Result<(), SshError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| SshError::KeyPreflightFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

    let mode = metadata.permissions().mode() & 0o777;
    if mode != crate::constants::ssh::REQUIRED_KEY_MODE {
        return Err(SshError::KeyPreflightFailed {
            path: path.to_string(),
            reason: format!(
                "expected mode {:o}, found {:o}",
                crate::constants::ssh::REQUIRED_KEY_MODE,
                mode
            ),
        });
    }

    Ok(())
}

#[cfg(not(unix))]
pub async fn preflight_key(_path: &str) -> Result<(), SshError> {
    Ok(())
}
