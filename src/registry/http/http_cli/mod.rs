mod authentication_flow;
mod private_impl;

use std::future::Future;
use std::time::Duration;

use http::Uri;

use crate::error::TransportFailure;
use crate::registry::{Credentials, RegistryOptions};

use super::util::{build_client, HttpsClient};

pub(super) use self::authentication_flow::{challenge_from, request_token};
pub(super) use self::private_impl::DrainedResponse;
use self::authentication_flow::basic_authorization;
use self::private_impl::{run_single_request, RequestHeaders};

// https://raw.githubusercontent.com/google/go-containerregistry/main/images/credhelper-basic.svg
pub struct HttpCli {
    pub inner_client: HttpsClient,
    pub timeout: Duration,
}

impl HttpCli {
    pub fn new(options: &RegistryOptions) -> Self {
        Self {
            inner_client: build_client(options.insecure_tls),
            timeout: options.timeout,
        }
    }

    /// Bounds a whole exchange, body included, by the configured timeout.
    pub async fn timed<Fut>(&self, request: Fut) -> Result<DrainedResponse, TransportFailure>
    where
        Fut: Future<Output = Result<DrainedResponse, TransportFailure>>,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Err(_) => Err(TransportFailure::Timeout(self.timeout)),
            Ok(r) => r,
        }
    }

    pub async fn get(
        &self,
        uri: &Uri,
        accept: &'static str,
        authorization: Option<String>,
    ) -> Result<DrainedResponse, TransportFailure> {
        let headers = RequestHeaders {
            accept: Some(accept),
            authorization,
        };
        self.timed(run_single_request(&self.inner_client, uri, &headers, 0))
            .await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Basic(String),
    Bearer(String),
}

impl Authorization {
    pub fn header_value(&self) -> String {
        match self {
            // already carries its scheme
            Authorization::Basic(encoded) => encoded.clone(),
            Authorization::Bearer(token) => format!("Bearer {}", token),
        }
    }
}

/// Authentication state of one pull. It lives exactly as long as the pull
/// that created it and is never shared between images.
pub struct PullSession<'a> {
    pub credentials: &'a Credentials,
    pub authorization: Option<Authorization>,
    pub manifest_requests: usize,
    pub token_requests: usize,
}

impl<'a> PullSession<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        let authorization = match (&credentials.token, &credentials.user) {
            (Some(token), _) => Some(Authorization::Bearer(token.clone())),
            (None, Some(user)) => Some(Authorization::Basic(basic_authorization(
                user,
                credentials.password.as_deref().unwrap_or(""),
            ))),
            (None, None) => None,
        };
        Self {
            credentials,
            authorization,
            manifest_requests: 0,
            token_requests: 0,
        }
    }

    pub fn authorization_header(&self) -> Option<String> {
        self.authorization.as_ref().map(|a| a.header_value())
    }
}
