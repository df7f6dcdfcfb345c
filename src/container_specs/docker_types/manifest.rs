use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Default, Clone)]
pub struct ManifestReference {
    #[serde(rename = "mediaType", default)]
    pub media_type: String,
    #[serde(default)]
    pub size: u64,
    pub digest: String,
}

/// Image manifest, version 2, schema 2.
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone)]
pub struct Manifest {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u16,

    #[serde(rename = "mediaType", default)]
    pub media_type: String,

    pub config: ManifestReference,

    pub layers: Vec<ManifestReference>,
}

impl Manifest {
    pub fn parse(manifest_bytes: &[u8]) -> Result<Manifest, serde_json::Error> {
        serde_json::from_slice(manifest_bytes)
    }

    /// Layer digests, base layer first. Schema 2 already lists them that way.
    pub fn layer_digests(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.digest.clone()).collect()
    }
}
