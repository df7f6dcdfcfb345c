use http::Uri;

use serde::{Deserialize, Serialize};

use crate::error::{Error, PullStep, TransportFailure};
use crate::registry::http::util::body_to_string;
use crate::registry::Credentials;

use super::private_impl::{run_single_request, BearerChallenge, DrainedResponse, RequestHeaders};
use super::HttpCli;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: Option<String>,
    pub access_token: Option<String>,
    pub expires_in: Option<u64>,
    pub issued_at: Option<String>,
}

impl AuthResponse {
    fn into_token(self) -> Option<String> {
        self.token
            .filter(|t| !t.is_empty())
            .or(self.access_token.filter(|t| !t.is_empty()))
    }
}

pub(crate) fn basic_authorization(user: &str, password: &str) -> String {
    use base64::prelude::*;
    format!(
        "Basic {}",
        BASE64_STANDARD.encode(format!("{}:{}", user, password))
    )
}

/// Reads the bearer challenge off a 401 response.
pub fn challenge_from(image: &str, response: &DrainedResponse) -> Result<BearerChallenge, Error> {
    let auth_header = response
        .headers
        .get(http::header::WWW_AUTHENTICATE)
        .ok_or_else(|| Error::Authentication {
            image: image.to_string(),
            step: PullStep::FetchingManifest,
            reason: format!("{} answered 401 without a Www-Authenticate header", response.uri),
        })?;
    let auth_header = auth_header.to_str().map_err(|e| Error::Authentication {
        image: image.to_string(),
        step: PullStep::FetchingManifest,
        reason: format!("Www-Authenticate header is not valid text: {}", e),
    })?;
    BearerChallenge::from_auth_header(auth_header).map_err(|e| Error::Authentication {
        image: image.to_string(),
        step: PullStep::FetchingManifest,
        reason: format!("Can't parse Www-Authenticate {:?}: {:#}", auth_header, e),
    })
}

fn token_uri(challenge: &BearerChallenge, credentials: &Credentials) -> Result<Uri, TransportFailure> {
    let mut query_items = vec![format!("service={}", challenge.service)];
    if let Some(scope) = &challenge.scope {
        query_items.push(format!("scope={}", scope));
    }
    if let Some(user) = &credentials.user {
        query_items.push(format!("account={}", user));
    }
    let new_query_items = query_items.join("&");

    let realm = challenge.realm.to_string();
    let new_uri = if realm.contains('?') {
        format!("{}&{}", realm, new_query_items)
    } else {
        format!("{}?{}", realm, new_query_items)
    };
    new_uri
        .parse::<Uri>()
        .map_err(|e| TransportFailure::InvalidUri(new_uri.clone(), e))
}

/// Exchanges a bearer challenge for a token at the challenge's realm.
pub async fn request_token(
    http_cli: &HttpCli,
    image: &str,
    challenge: &BearerChallenge,
    credentials: &Credentials,
) -> Result<String, Error> {
    let new_uri = token_uri(challenge, credentials).map_err(|source| Error::Transport {
        image: image.to_string(),
        step: PullStep::RequestingToken,
        uri: challenge.realm.to_string(),
        source,
    })?;

    let headers = RequestHeaders {
        accept: Some("application/json"),
        authorization: credentials.user.as_ref().map(|user| {
            basic_authorization(user, credentials.password.as_deref().unwrap_or(""))
        }),
    };

    tracing::debug!("Requesting token for {} from {}", image, challenge);
    let response = http_cli
        .timed(run_single_request(&http_cli.inner_client, &new_uri, &headers, 0))
        .await
        .map_err(|source| Error::Transport {
            image: image.to_string(),
            step: PullStep::RequestingToken,
            uri: new_uri.to_string(),
            source,
        })?;

    if !response.status.is_success() {
        return Err(Error::Authentication {
            image: image.to_string(),
            step: PullStep::RequestingToken,
            reason: format!(
                "Token request to {} returned {}, body:\n{}",
                new_uri,
                response.status,
                body_to_string(&response.body)
            ),
        });
    }

    let auth_response: AuthResponse =
        serde_json::from_slice(&response.body).map_err(|e| Error::Authentication {
            image: image.to_string(),
            step: PullStep::RequestingToken,
            reason: format!("Token response from {} is not valid json: {}", new_uri, e),
        })?;

    auth_response.into_token().ok_or_else(|| Error::Authentication {
        image: image.to_string(),
        step: PullStep::RequestingToken,
        reason: format!("Token response from {} carried no token", new_uri),
    })
}
