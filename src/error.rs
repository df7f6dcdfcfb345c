use std::time::Duration;

use http::StatusCode;

/// The step of a pull that was in progress when something went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullStep {
    FetchingManifest,
    RequestingToken,
    DecodingManifest,
}

impl std::fmt::Display for PullStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PullStep::FetchingManifest => "fetching manifest",
            PullStep::RequestingToken => "requesting token",
            PullStep::DecodingManifest => "decoding manifest",
        };
        write!(f, "{}", s)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TransportFailure {
    #[error("Failed to connect: '{0}'")]
    Connect(#[source] hyper::Error),
    #[error("Generic hyper error: '{0}'")]
    Hyper(#[source] hyper::Error),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    #[error("Unable to build request: '{0}'")]
    InvalidRequest(#[from] http::Error),
    #[error("Invalid uri {0:?}: '{1}'")]
    InvalidUri(String, #[source] http::uri::InvalidUri),
    #[error("Gave up after following {0} redirects")]
    TooManyRedirects(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Malformed image reference {input:?}: {reason}")]
    MalformedReference { input: String, reason: String },

    #[error("Authentication for {image} failed while {step}: {reason}")]
    Authentication {
        image: String,
        step: PullStep,
        reason: String,
    },

    #[error("Registry answered {status} for {image} while {step}, uri: {uri}, body:\n{body}")]
    HttpStatus {
        image: String,
        step: PullStep,
        uri: String,
        status: StatusCode,
        body: String,
    },

    #[error("Unable to decode manifest for {image} while {step} (content type {content_type:?}): {source}")]
    ManifestDecode {
        image: String,
        step: PullStep,
        content_type: Option<String>,
        #[source]
        source: serde_json::Error,
    },

    #[error("Transport failure for {image} while {step}, uri: {uri}: {source}")]
    Transport {
        image: String,
        step: PullStep,
        uri: String,
        #[source]
        source: TransportFailure,
    },
}

impl Error {
    pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Self {
        Error::MalformedReference {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
