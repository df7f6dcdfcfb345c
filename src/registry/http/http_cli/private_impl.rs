use anyhow::Context;
use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, LOCATION};
use http::{HeaderMap, StatusCode, Uri};
use hyper::Body;
use regex::Regex;

use crate::error::TransportFailure;
use crate::registry::http::util::HttpsClient;

const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Clone)]
pub struct BearerChallenge {
    pub realm: Uri,
    pub service: String,
    pub scope: Option<String>,
}
impl std::fmt::Display for BearerChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ realm: {}, service: {}, scope: {} }}",
            self.realm,
            self.service,
            self.scope.as_deref().unwrap_or("")
        )
    }
}

impl BearerChallenge {
    pub fn from_auth_header(auth_header: &str) -> anyhow::Result<Self> {
        let mut realm = None;
        let mut scope = None;
        let mut service = None;

        let auth_header = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| anyhow::anyhow!("Not a bearer challenge"))?;

        // values may hold commas, e.g. scope="repository:a:pull,push", so this
        // splits on quoted strings first and bare words second
        let csv_split_safe_regex = Regex::new(r#"(".*?"|[^",\s]+)"#).unwrap();

        // this will split into pairs of '{key}=' and 'value'
        let pairs: Vec<&str> = csv_split_safe_regex
            .captures_iter(auth_header)
            .map(|e| {
                let (_, [m]) = e.extract();
                m
            })
            .collect();
        if (pairs.len() % 2) != 0 {
            anyhow::bail!("Invalid auth header, expected key value pairs but got {} parts: {:#?}", pairs.len(), pairs);
        }

        for pair in pairs.chunks(2) {
            let (key, value) = (pair[0], pair[1].trim_matches('"'));
            let key = match key.strip_suffix('=') {
                Some(k) => k.trim_matches('"'),
                None => anyhow::bail!(
                    "Invalid auth header, looking at part: '{}', we couldn't find a trailing '='",
                    key
                ),
            };
            match key {
                "realm" => {
                    realm = Some(
                        value
                            .parse::<Uri>()
                            .with_context(|| format!("Failed to parse realm from {:?}", value))?,
                    )
                }
                "service" => service = Some(value.to_string()),
                "scope" => scope = Some(value.to_string()),
                _ => (),
            }
        }

        match (realm, service) {
            (Some(realm), Some(service)) => Ok(Self {
                realm,
                service,
                scope,
            }),
            _ => Err(anyhow::anyhow!("Challenge is missing its realm or service")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestHeaders {
    pub accept: Option<&'static str>,
    pub authorization: Option<String>,
}

/// A response whose body has already been read to the end.
#[derive(Debug)]
pub struct DrainedResponse {
    pub uri: Uri,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl DrainedResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

fn resolve_location(current: &Uri, location: &str) -> Result<Uri, TransportFailure> {
    let absolute = if location.starts_with('/') {
        format!(
            "{}://{}{}",
            current.scheme_str().unwrap_or("https"),
            current.authority().map(|a| a.as_str()).unwrap_or(""),
            location
        )
    } else {
        location.to_string()
    };
    absolute
        .parse::<Uri>()
        .map_err(|e| TransportFailure::InvalidUri(absolute.clone(), e))
}

#[async_recursion::async_recursion]
pub async fn run_single_request(
    inner_client: &HttpsClient,
    uri: &Uri,
    headers: &RequestHeaders,
    redirects: usize,
) -> Result<DrainedResponse, TransportFailure> {
    let mut req_builder = http::request::Builder::default()
        .method(http::Method::GET)
        .uri(uri.clone());
    if let Some(accept) = headers.accept {
        req_builder = req_builder.header(ACCEPT, accept);
    }
    if let Some(authorization) = &headers.authorization {
        req_builder = req_builder.header(AUTHORIZATION, authorization.as_str());
    }
    let request = req_builder.body(Body::empty())?;

    tracing::debug!(
        "GET {} (authorization: {})",
        uri,
        headers.authorization.is_some()
    );
    let mut response = inner_client.request(request).await.map_err(|e| {
        if e.is_connect() {
            TransportFailure::Connect(e)
        } else {
            TransportFailure::Hyper(e)
        }
    })?;

    // read to the end on every path so the connection can go back to the pool
    let body = hyper::body::to_bytes(response.body_mut())
        .await
        .map_err(TransportFailure::Hyper)?;
    let status = response.status();
    tracing::debug!("{} answered {} with {} bytes", uri, status, body.len());

    if status.is_redirection() {
        if let Some(location) = response
            .headers()
            .get(LOCATION)
            .and_then(|l| l.to_str().ok())
        {
            if redirects >= MAX_REDIRECTS {
                return Err(TransportFailure::TooManyRedirects(redirects));
            }
            let next = resolve_location(uri, location)?;
            // credentials stay with the host they were meant for
            let next_headers = if next.authority() == uri.authority() {
                headers.clone()
            } else {
                RequestHeaders {
                    accept: headers.accept,
                    authorization: None,
                }
            };
            return run_single_request(inner_client, &next, &next_headers, redirects + 1).await;
        }
    }

    Ok(DrainedResponse {
        uri: uri.clone(),
        status,
        headers: response.headers().clone(),
        body,
    })
}
