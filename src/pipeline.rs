use std::sync::Arc;

use anyhow::{Context, Error};

use crate::image::ImageDescriptor;
use crate::reference::{ImageReference, ReferenceDefaults};
use crate::registry::{Credentials, ManifestPuller};

/// Vulnerability scanner side of the pipeline.
#[async_trait::async_trait]
pub trait LayerAnalyzer: Send + Sync {
    type Report: Send + Sync;

    /// Only ever called with at least one layer.
    async fn analyze(&self, image: &ImageDescriptor) -> Result<Self::Report, Error>;
}

/// Where analysis results end up, e.g. a triplestore.
#[async_trait::async_trait]
pub trait FeaturePublisher<R: Send + Sync>: Send + Sync {
    async fn publish(&self, image: &ImageDescriptor, report: &R) -> Result<(), Error>;
}

pub struct Annotator<A, P> {
    pub puller: Arc<dyn ManifestPuller>,
    pub analyzer: A,
    pub publisher: P,
    pub defaults: ReferenceDefaults,
    pub credentials: Credentials,
}

impl<A, P> Annotator<A, P>
where
    A: LayerAnalyzer,
    P: FeaturePublisher<A::Report>,
{
    /// Resolves and pulls `raw_reference`, then analyzes and publishes it.
    ///
    /// Returns `None` without calling the analyzer when the image holds only
    /// empty layers. A failing publisher is logged and does not fail the call.
    pub async fn annotate(&self, raw_reference: &str) -> Result<Option<A::Report>, Error> {
        let reference = ImageReference::parse(raw_reference, &self.defaults)?;
        let image = self
            .puller
            .pull(&reference, &self.credentials)
            .await
            .with_context(|| format!("Can't pull image {}", reference))?;

        let image = image.without_empty_layers();
        if image.is_empty() {
            tracing::warn!(
                "no need to analyse image {} as there is no non-empty layer",
                reference
            );
            return Ok(None);
        }

        let report = self
            .analyzer
            .analyze(&image)
            .await
            .with_context(|| format!("Analysing image {} failed", reference))?;

        if let Err(e) = self.publisher.publish(&image, &report).await {
            tracing::warn!("Publishing results for {} failed: {:#}", reference, e);
        }
        Ok(Some(report))
    }
}
