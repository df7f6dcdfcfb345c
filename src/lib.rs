use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Error};
use clap::Parser;
use serde::Serialize;

use image::{ImageDescriptor, LayerAddress};
use reference::{ImageReference, ReferenceDefaults, DOCKER_HUB};
use registry::{Credentials, RegistryOptions};

#[derive(Parser, Debug)]
#[clap(name = "image puller")]
pub struct Opt {
    /// Image to resolve, e.g. `ubuntu`, `quay.io/org/app:1.0` or `app@sha256:...`.
    pub image: String,

    #[clap(long, env = "DEFAULT_REGISTRY", default_value = DOCKER_HUB)]
    pub default_registry: String,

    #[clap(long, env = "DOCKER_USER")]
    pub user: Option<String>,

    #[clap(long, env = "DOCKER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[clap(long, env = "DOCKER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Don't verify the registry's TLS certificate.
    #[clap(long, env = "DOCKER_INSECURE")]
    pub insecure_tls: bool,

    /// Talk plain http to the registry.
    #[clap(long, env = "REGISTRY_INSECURE")]
    pub insecure_registry: bool,

    /// Per request timeout, in minutes.
    #[clap(long, env = "DOCKER_TIMEOUT", default_value_t = 1)]
    pub timeout_minutes: u64,

    #[clap(long)]
    pub keep_empty_layers: bool,

    #[clap(long)]
    pub output_path: Option<PathBuf>,
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_ref().filter(|s| !s.is_empty()).cloned()
}

impl Opt {
    pub fn reference_defaults(&self) -> ReferenceDefaults {
        ReferenceDefaults {
            registry_host: self.default_registry.clone(),
            insecure_registry: self.insecure_registry,
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            user: non_empty(&self.user),
            password: non_empty(&self.password),
            token: non_empty(&self.token),
        }
    }

    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            insecure_tls: self.insecure_tls,
            timeout: Duration::from_secs(self.timeout_minutes.max(1).saturating_mul(60)),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct PullOutput {
    pub image: ImageDescriptor,
    pub analyzed_layer: Option<String>,
    pub layers: Vec<LayerAddress>,
}

impl PullOutput {
    pub fn write_file(&self, f: impl AsRef<Path>) -> Result<(), Error> {
        use std::fs::File;
        use std::io::BufWriter;

        let file = File::create(f.as_ref())?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

pub async fn pull_main(opt: Opt) -> Result<PullOutput, anyhow::Error> {
    let reference = ImageReference::parse(&opt.image, &opt.reference_defaults())?;

    let image = registry::pull(&reference, &opt.credentials(), &opt.registry_options())
        .await
        .with_context(|| format!("Can't pull image {}", reference))?;

    let image = if opt.keep_empty_layers {
        image
    } else {
        image.without_empty_layers()
    };

    let output = PullOutput {
        analyzed_layer: image.analyzed_layer_name(),
        layers: image.layer_addresses(),
        image,
    };

    if let Some(output_path) = &opt.output_path {
        output
            .write_file(output_path)
            .with_context(|| format!("Failed to write pull output to {:?}", output_path))?;
    }

    Ok(output)
}

pub mod container_specs;
pub mod error;
pub mod image;
pub mod pipeline;
pub mod reference;
pub mod registry;

pub use error::Error as PullError;
