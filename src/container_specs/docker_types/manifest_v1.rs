use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone)]
pub struct FsLayer {
    #[serde(rename = "blobSum")]
    pub blob_sum: String,
}

/// Image manifest, version 2, schema 1.
///
/// Only the parts needed to list layers are kept; history and signatures are
/// ignored while decoding.
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone)]
pub struct Manifest {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(rename = "fsLayers")]
    pub fs_layers: Vec<FsLayer>,
}

impl Manifest {
    pub fn parse(manifest_bytes: &[u8]) -> Result<Manifest, serde_json::Error> {
        serde_json::from_slice(manifest_bytes)
    }

    /// Layer digests, base layer first. Schema 1 lists the top layer first so
    /// the order is flipped here.
    pub fn layer_digests(&self) -> Vec<String> {
        self.fs_layers
            .iter()
            .rev()
            .map(|l| l.blob_sum.clone())
            .collect()
    }
}
