mod http;

use std::{sync::Arc, time::Duration};

use crate::error::Error;
use crate::image::ImageDescriptor;
use crate::reference::ImageReference;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub user: Option<String>,
    pub password: Option<String>,
    /// Bearer token to start with. A challenge still replaces it.
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Skip verification of the registry's TLS certificate.
    pub insecure_tls: bool,
    /// Applied to every request of a pull, body included.
    pub timeout: Duration,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            insecure_tls: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[async_trait::async_trait]
pub trait ManifestPuller: Send + Sync {
    /// Fetches the manifest of `reference` and normalizes its layers.
    ///
    /// Each call is its own session: tokens obtained here are not seen by any
    /// other call.
    async fn pull(
        &self,
        reference: &ImageReference,
        credentials: &Credentials,
    ) -> Result<ImageDescriptor, Error>;
}

pub fn http_puller(options: &RegistryOptions) -> Arc<dyn ManifestPuller> {
    Arc::new(http::HttpRegistry::new(options))
}

pub async fn pull(
    reference: &ImageReference,
    credentials: &Credentials,
    options: &RegistryOptions,
) -> Result<ImageDescriptor, Error> {
    http::HttpRegistry::new(options)
        .pull(reference, credentials)
        .await
}
