use super::docker_types::{manifest as schema2, manifest_v1 as schema1};
use super::{SchemaVersion, MANIFEST_V2_MEDIA_TYPE};

/// A manifest as served by the registry, in whichever schema it came in.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Manifest {
    V1(schema1::Manifest),
    V2(schema2::Manifest),
}

/// Drops parameters such as `; charset=utf-8` from a content type.
fn media_type_essence(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
}

impl Manifest {
    /// Picks the schema from the response content type. Only the schema 2
    /// media type selects schema 2; everything else is read as schema 1.
    pub fn decode(content_type: Option<&str>, body: &[u8]) -> Result<Manifest, serde_json::Error> {
        match content_type.map(media_type_essence) {
            Some(MANIFEST_V2_MEDIA_TYPE) => Ok(Manifest::V2(schema2::Manifest::parse(body)?)),
            _ => Ok(Manifest::V1(schema1::Manifest::parse(body)?)),
        }
    }

    pub fn schema_version(&self) -> SchemaVersion {
        match self {
            Manifest::V1(_) => SchemaVersion::V1,
            Manifest::V2(_) => SchemaVersion::V2,
        }
    }

    /// Digest of the image configuration. Schema 1 has none.
    pub fn config_digest(&self) -> Option<&str> {
        match self {
            Manifest::V1(_) => None,
            Manifest::V2(m) => Some(m.config.digest.as_str()),
        }
    }

    /// Layer digests ordered base layer first, regardless of schema.
    pub fn layer_digests(&self) -> Vec<String> {
        match self {
            Manifest::V1(m) => m.layer_digests(),
            Manifest::V2(m) => m.layer_digests(),
        }
    }
}
