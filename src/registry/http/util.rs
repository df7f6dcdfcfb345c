use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use hyper::Client;
use hyper_rustls::ConfigBuilderExt;
use rustls::client::{ServerCertVerified, ServerCertVerifier};

pub(super) type HttpsClient = Client<hyper_rustls::HttpsConnector<hyper::client::HttpConnector>>;

/// Used when the registry's certificate must not be checked.
struct AcceptAnyServerCert;

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::Certificate,
        _intermediates: &[rustls::Certificate],
        _server_name: &rustls::ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }
}

pub(super) fn build_client(insecure_tls: bool) -> HttpsClient {
    let builder = rustls::ClientConfig::builder().with_safe_defaults();
    let tls = if insecure_tls {
        tracing::debug!("TLS certificate verification disabled for registry requests");
        builder
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert))
            .with_no_client_auth()
    } else {
        builder.with_native_roots().with_no_client_auth()
    };

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_http1()
        .build();

    Client::builder().build::<_, hyper::Body>(https)
}

pub(super) fn body_to_string(body: &Bytes) -> String {
    String::from_utf8_lossy(body).into_owned()
}
