pub mod docker_types;
pub mod manifest;

use serde::Serialize;

pub use manifest::Manifest;

pub const MANIFEST_V2_MEDIA_TYPE: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const MANIFEST_V1_MEDIA_TYPE: &str =
    "application/vnd.docker.distribution.manifest.v1+prettyjws";

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Serialize)]
#[serde(into = "u16")]
pub enum SchemaVersion {
    V1,
    V2,
}

impl From<SchemaVersion> for u16 {
    fn from(v: SchemaVersion) -> Self {
        match v {
            SchemaVersion::V1 => 1,
            SchemaVersion::V2 => 2,
        }
    }
}
