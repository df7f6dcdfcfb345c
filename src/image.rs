use serde::Serialize;

use crate::container_specs::{Manifest, SchemaVersion};
use crate::reference::ImageReference;

/// Blob sum of the no-op layer docker inserts for metadata-only build steps.
pub const EMPTY_LAYER_BLOB_SUM: &str =
    "sha256:a3ed95caeb02ffe68cdd9fd84406680ae93d633cb16422d00e8a7c22955b46d4";

const LAYER_FORMAT: &str = "Docker";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedLayer {
    pub digest: String,
    /// 0 is the base layer.
    pub position: usize,
}

/// What a scanner needs to fetch and chain one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerAddress {
    pub name: String,
    pub path: String,
    pub parent_name: Option<String>,
    pub format: &'static str,
    #[serde(skip)]
    pub authorization: Option<String>,
}

/// Result of a successful pull. Layers are always ordered base to top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageDescriptor {
    reference: ImageReference,
    digest: Option<String>,
    schema_version: SchemaVersion,
    layers: Vec<NormalizedLayer>,
    #[serde(skip)]
    authorization: Option<String>,
}

fn trim_digest(d: &str) -> &str {
    d.strip_prefix("sha256:").unwrap_or(d)
}

fn number_layers<I: IntoIterator<Item = String>>(digests: I) -> Vec<NormalizedLayer> {
    digests
        .into_iter()
        .enumerate()
        .map(|(position, digest)| NormalizedLayer { digest, position })
        .collect()
}

impl ImageDescriptor {
    pub fn new<I: IntoIterator<Item = String>>(
        reference: ImageReference,
        digest: Option<String>,
        schema_version: SchemaVersion,
        layer_digests: I,
    ) -> Self {
        Self {
            reference,
            digest,
            schema_version,
            layers: number_layers(layer_digests),
            authorization: None,
        }
    }

    pub(crate) fn from_manifest(
        reference: ImageReference,
        manifest: &Manifest,
        authorization: Option<String>,
    ) -> Self {
        Self {
            authorization,
            ..Self::new(
                reference,
                manifest.config_digest().map(|d| d.to_string()),
                manifest.schema_version(),
                manifest.layer_digests(),
            )
        }
    }

    pub fn reference(&self) -> &ImageReference {
        &self.reference
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    pub fn schema_version(&self) -> SchemaVersion {
        self.schema_version
    }

    pub fn layers(&self) -> &[NormalizedLayer] {
        &self.layers
    }

    /// `Authorization` header value the pull ended with, if any.
    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer_name(&self, index: usize) -> Option<String> {
        let layer = self.layers.get(index)?;
        Some(format!(
            "{}{}",
            trim_digest(self.digest().unwrap_or("")),
            trim_digest(&layer.digest)
        ))
    }

    pub fn parent_layer_name(&self, index: usize) -> Option<String> {
        if index == 0 {
            return None;
        }
        self.layer_name(index - 1)
    }

    /// The layer a scanner reports on: the top layer, or layer 0 for schema 1.
    pub fn analyzed_layer_name(&self) -> Option<String> {
        let index = match self.schema_version {
            SchemaVersion::V1 => 0,
            SchemaVersion::V2 => self.layers.len().checked_sub(1)?,
        };
        self.layer_name(index)
    }

    pub fn layer_path(&self, index: usize) -> Option<String> {
        let layer = self.layers.get(index)?;
        Some(self.reference.blob_url(&layer.digest))
    }

    pub fn layer_addresses(&self) -> Vec<LayerAddress> {
        (0..self.layers.len())
            .filter_map(|index| {
                Some(LayerAddress {
                    name: self.layer_name(index)?,
                    path: self.layer_path(index)?,
                    parent_name: self.parent_layer_name(index),
                    format: LAYER_FORMAT,
                    authorization: self.authorization.clone(),
                })
            })
            .collect()
    }

    /// Copy of this descriptor with every empty layer dropped and the rest
    /// renumbered, so parents stay positional.
    pub fn without_empty_layers(&self) -> ImageDescriptor {
        let kept = self
            .layers
            .iter()
            .filter(|l| l.digest != EMPTY_LAYER_BLOB_SUM)
            .map(|l| l.digest.clone());
        ImageDescriptor {
            layers: number_layers(kept),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceDefaults;

    fn reference() -> ImageReference {
        ImageReference::parse("quay.io/team/app:1.0", &ReferenceDefaults::default()).unwrap()
    }

    fn descriptor(schema_version: SchemaVersion, digest: Option<&str>, layers: &[&str]) -> ImageDescriptor {
        ImageDescriptor::new(
            reference(),
            digest.map(|d| d.to_string()),
            schema_version,
            layers.iter().map(|l| l.to_string()),
        )
    }

    #[test]
    fn test_layer_names_join_image_and_layer_digest() {
        let d = descriptor(SchemaVersion::V2, Some("sha256:img"), &["sha256:a", "sha256:b"]);
        assert_eq!(d.layer_name(0).as_deref(), Some("imga"));
        assert_eq!(d.layer_name(1).as_deref(), Some("imgb"));
        assert_eq!(d.layer_name(2), None);
        assert_eq!(d.parent_layer_name(0), None);
        assert_eq!(d.parent_layer_name(1).as_deref(), Some("imga"));
    }

    #[test]
    fn test_analyzed_layer() {
        let v2 = descriptor(SchemaVersion::V2, Some("sha256:img"), &["sha256:a", "sha256:b"]);
        assert_eq!(v2.analyzed_layer_name().as_deref(), Some("imgb"));

        let v1 = descriptor(SchemaVersion::V1, None, &["sha256:a", "sha256:b"]);
        assert_eq!(v1.analyzed_layer_name().as_deref(), Some("a"));

        let empty = descriptor(SchemaVersion::V2, Some("sha256:img"), &[]);
        assert_eq!(empty.analyzed_layer_name(), None);
    }

    #[test]
    fn test_layer_addresses() {
        let d = descriptor(SchemaVersion::V2, Some("sha256:img"), &["sha256:a", "sha256:b"]);
        let addresses = d.layer_addresses();
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0].path, "https://quay.io/v2/team/app/blobs/sha256:a");
        assert_eq!(addresses[0].parent_name, None);
        assert_eq!(addresses[1].path, "https://quay.io/v2/team/app/blobs/sha256:b");
        assert_eq!(addresses[1].parent_name.as_deref(), Some("imga"));
        assert_eq!(addresses[1].format, "Docker");
        assert_eq!(addresses[1].authorization, None);
    }

    #[test]
    fn test_filtering_empty_layers_renumbers() {
        let d = descriptor(
            SchemaVersion::V2,
            Some("sha256:img"),
            &[EMPTY_LAYER_BLOB_SUM, "sha256:a", EMPTY_LAYER_BLOB_SUM, "sha256:b"],
        );
        let filtered = d.without_empty_layers();
        assert_eq!(
            filtered.layers(),
            &[
                NormalizedLayer {
                    digest: "sha256:a".to_string(),
                    position: 0
                },
                NormalizedLayer {
                    digest: "sha256:b".to_string(),
                    position: 1
                },
            ]
        );
        assert_eq!(filtered.parent_layer_name(1).as_deref(), Some("imga"));
        // the original is left alone
        assert_eq!(d.layers().len(), 4);
    }

    #[test]
    fn test_filtering_only_empty_layers_leaves_nothing() {
        let d = descriptor(
            SchemaVersion::V1,
            None,
            &[EMPTY_LAYER_BLOB_SUM, EMPTY_LAYER_BLOB_SUM],
        );
        let filtered = d.without_empty_layers();
        assert!(filtered.is_empty());
        assert!(filtered.layer_addresses().is_empty());
    }

    #[test]
    fn test_authorization_is_not_serialized() {
        let mut d = descriptor(SchemaVersion::V2, Some("sha256:img"), &["sha256:a"]);
        d.authorization = Some("Bearer secret".to_string());
        let json = serde_json::to_string(&d).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"schema_version\":2"));
        assert_eq!(d.layer_addresses()[0].authorization.as_deref(), Some("Bearer secret"));
    }
}
