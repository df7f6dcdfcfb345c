mod http_cli;
mod util;

use http::{StatusCode, Uri};

use crate::container_specs::Manifest;
use crate::error::{Error, PullStep, TransportFailure};
use crate::image::ImageDescriptor;
use crate::reference::ImageReference;

use self::http_cli::{challenge_from, request_token, Authorization, DrainedResponse, HttpCli, PullSession};
use self::util::body_to_string;
use super::{Credentials, RegistryOptions};

/// The first request plus one retry per token exchange.
const MAX_MANIFEST_REQUESTS: usize = 3;

// schema 2 first, schema 1 as a fallback
const MANIFEST_ACCEPT: &str = "application/vnd.docker.distribution.manifest.v2+json, application/vnd.docker.distribution.manifest.v1+prettyjws";

pub struct HttpRegistry {
    http_client: HttpCli,
}

#[async_trait::async_trait]
impl super::ManifestPuller for HttpRegistry {
    async fn pull(
        &self,
        reference: &ImageReference,
        credentials: &Credentials,
    ) -> Result<ImageDescriptor, Error> {
        let image = reference.to_string();
        let manifest_url = reference.manifest_url();
        let uri = manifest_url
            .parse::<Uri>()
            .map_err(|e| Error::Transport {
                image: image.clone(),
                step: PullStep::FetchingManifest,
                uri: manifest_url.clone(),
                source: TransportFailure::InvalidUri(manifest_url.clone(), e),
            })?;

        let mut session = PullSession::new(credentials);
        let response = self.fetch_manifest(&image, &uri, &mut session).await?;

        let manifest = Manifest::decode(response.content_type(), &response.body).map_err(|source| {
            Error::ManifestDecode {
                image: image.clone(),
                step: PullStep::DecodingManifest,
                content_type: response.content_type().map(|c| c.to_string()),
                source,
            }
        })?;

        let descriptor =
            ImageDescriptor::from_manifest(reference.clone(), &manifest, session.authorization_header());
        tracing::info!(
            "Pulled manifest of {}: schema {}, {} layers, after {} manifest and {} token requests",
            image,
            u16::from(descriptor.schema_version()),
            descriptor.layers().len(),
            session.manifest_requests,
            session.token_requests
        );
        Ok(descriptor)
    }
}

impl HttpRegistry {
    pub(crate) fn new(options: &RegistryOptions) -> HttpRegistry {
        HttpRegistry {
            http_client: HttpCli::new(options),
        }
    }

    /// Runs the manifest request, answering bearer challenges with a fresh
    /// token, until a non-401 response arrives or the request budget is spent.
    async fn fetch_manifest(
        &self,
        image: &str,
        uri: &Uri,
        session: &mut PullSession<'_>,
    ) -> Result<DrainedResponse, Error> {
        loop {
            session.manifest_requests += 1;
            let response = self
                .http_client
                .get(uri, MANIFEST_ACCEPT, session.authorization_header())
                .await
                .map_err(|source| Error::Transport {
                    image: image.to_string(),
                    step: PullStep::FetchingManifest,
                    uri: uri.to_string(),
                    source,
                })?;

            if response.status == StatusCode::UNAUTHORIZED
                && session.manifest_requests < MAX_MANIFEST_REQUESTS
            {
                let challenge = challenge_from(image, &response)?;
                session.token_requests += 1;
                let token = request_token(&self.http_client, image, &challenge, session.credentials).await?;
                tracing::debug!(
                    "Obtained token {} of this pull for {}",
                    session.token_requests,
                    image
                );
                session.authorization = Some(Authorization::Bearer(token));
                continue;
            }

            if !response.status.is_success() {
                return Err(Error::HttpStatus {
                    image: image.to_string(),
                    step: PullStep::FetchingManifest,
                    uri: response.uri.to_string(),
                    status: response.status,
                    body: body_to_string(&response.body),
                });
            }

            return Ok(response);
        }
    }
}
