use serde::Serialize;

use crate::error::Error;

pub const DOCKER_HUB: &str = "registry-1.docker.io";
pub const DEFAULT_TAG: &str = "latest";
const API_VERSION_PATH: &str = "v2";

/// What to fall back to when a reference leaves parts of its coordinates out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDefaults {
    pub registry_host: String,
    /// Talk plain http to the registry instead of https.
    pub insecure_registry: bool,
}

impl Default for ReferenceDefaults {
    fn default() -> Self {
        Self {
            registry_host: DOCKER_HUB.to_string(),
            insecure_registry: false,
        }
    }
}

/// Normalized coordinates of an image in a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageReference {
    /// API base url, e.g. `https://registry-1.docker.io/v2`.
    pub registry: String,
    /// Bare `host[:port]` the registry url was built from.
    pub host: String,
    pub repository: String,
    /// Empty when the reference was given by digest.
    pub tag: String,
    pub digest: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Addressing {
    Tag,
    Digest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Initial,
    CollectingName,
    CollectingPort,
    CollectingTagOrDigest(Addressing),
}

fn is_boundary(c: char) -> bool {
    matches!(c, ':' | '/' | '@')
}

fn addressing_for(boundary: char) -> Addressing {
    if boundary == '@' {
        Addressing::Digest
    } else {
        Addressing::Tag
    }
}

fn is_registry_host(segment: &str) -> bool {
    segment == "localhost" || segment.contains('.')
}

fn non_empty<'a>(raw: &str, segment: &'a str, what: &str) -> Result<&'a str, Error> {
    if segment.is_empty() {
        Err(Error::malformed(raw, format!("empty {}", what)))
    } else {
        Ok(segment)
    }
}

impl ImageReference {
    /// Parses references of the shape `[host[:port]/]name[/name...][:tag|@digest]`.
    ///
    /// The scan runs once, left to right, splitting on `:`, `/` and `@`. The end
    /// of the string closes whatever segment is still open. Once a tag or digest
    /// starts the rest of the input is taken verbatim, so `sha256:...` digests
    /// keep their colon.
    pub fn parse(raw: &str, defaults: &ReferenceDefaults) -> Result<ImageReference, Error> {
        if raw.is_empty() {
            return Err(Error::malformed(raw, "reference is empty"));
        }

        let mut state = ScanState::Initial;
        let mut registry_host: Option<&str> = None;
        let mut port: Option<&str> = None;
        let mut name_parts: Vec<&str> = Vec::new();
        let mut start = 0;

        for (idx, c) in raw.char_indices() {
            if !is_boundary(c) {
                continue;
            }
            let segment = &raw[start..idx];
            start = idx + c.len_utf8();

            state = match state {
                ScanState::Initial => {
                    let segment = non_empty(raw, segment, "leading segment")?;
                    if c != '@' && is_registry_host(segment) {
                        registry_host = Some(segment);
                        if c == ':' {
                            ScanState::CollectingPort
                        } else {
                            ScanState::CollectingName
                        }
                    } else if c == '/' {
                        name_parts.push(segment);
                        ScanState::CollectingName
                    } else {
                        // official image on the default registry
                        name_parts.push("library");
                        name_parts.push(segment);
                        ScanState::CollectingTagOrDigest(addressing_for(c))
                    }
                }
                ScanState::CollectingPort => {
                    if c != '/' {
                        return Err(Error::malformed(
                            raw,
                            "registry port must be followed by a repository",
                        ));
                    }
                    let segment = non_empty(raw, segment, "registry port")?;
                    if !segment.chars().all(|d| d.is_ascii_digit()) {
                        return Err(Error::malformed(
                            raw,
                            format!("registry port {:?} is not numeric", segment),
                        ));
                    }
                    port = Some(segment);
                    ScanState::CollectingName
                }
                ScanState::CollectingName => {
                    name_parts.push(non_empty(raw, segment, "repository path segment")?);
                    if c == '/' {
                        ScanState::CollectingName
                    } else {
                        ScanState::CollectingTagOrDigest(addressing_for(c))
                    }
                }
                ScanState::CollectingTagOrDigest(_) => state,
            };

            if let ScanState::CollectingTagOrDigest(_) = state {
                break;
            }
        }

        let rest = &raw[start..];
        let mut tag = DEFAULT_TAG.to_string();
        let mut digest = None;
        match state {
            ScanState::Initial => {
                name_parts.push("library");
                name_parts.push(rest);
            }
            ScanState::CollectingName => {
                name_parts.push(non_empty(raw, rest, "repository path segment")?);
            }
            ScanState::CollectingPort => {
                return Err(Error::malformed(
                    raw,
                    "registry given without a repository",
                ));
            }
            ScanState::CollectingTagOrDigest(Addressing::Tag) => match rest.split_once('@') {
                // `name:tag@digest` pins the digest, the tag is dropped
                Some((pinned_tag, pinned_digest)) => {
                    non_empty(raw, pinned_tag, "tag")?;
                    tag = String::new();
                    digest = Some(non_empty(raw, pinned_digest, "digest")?.to_string());
                }
                None => {
                    tag = non_empty(raw, rest, "tag")?.to_string();
                }
            },
            ScanState::CollectingTagOrDigest(Addressing::Digest) => {
                tag = String::new();
                digest = Some(non_empty(raw, rest, "digest")?.to_string());
            }
        }

        let mut host = registry_host
            .unwrap_or(defaults.registry_host.as_str())
            .to_string();
        if let Some(port) = port {
            host = format!("{}:{}", host, port);
        }
        let scheme = if defaults.insecure_registry {
            "http"
        } else {
            "https"
        };

        Ok(ImageReference {
            registry: format!("{}://{}/{}", scheme, host, API_VERSION_PATH),
            host,
            repository: name_parts.join("/"),
            tag,
            digest,
        })
    }

    /// The tag or digest the manifest is requested by; a digest always wins.
    pub fn manifest_reference(&self) -> &str {
        self.digest.as_deref().unwrap_or(&self.tag)
    }

    pub fn manifest_url(&self) -> String {
        format!(
            "{}/{}/manifests/{}",
            self.registry,
            self.repository,
            self.manifest_reference()
        )
    }

    pub fn blob_url(&self, digest: &str) -> String {
        format!("{}/{}/blobs/{}", self.registry, self.repository, digest)
    }
}

impl std::fmt::Display for ImageReference {
    /// A host that would not scan back as a registry can only have come from
    /// the defaults, so it is left out and the defaults supply it again.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let host_name = self.host.split(':').next().unwrap_or(&self.host);
        if is_registry_host(host_name) {
            write!(f, "{}/", self.host)?;
        }
        match &self.digest {
            Some(digest) => write!(f, "{}@{}", self.repository, digest),
            None => write!(f, "{}:{}", self.repository, self.tag),
        }
    }
}
