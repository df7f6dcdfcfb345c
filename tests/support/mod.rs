#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};

/// What the fake registry saw of one request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: Option<String>,
    pub host: String,
    pub authorization: Option<String>,
    pub accept: Option<String>,
}

impl RecordedRequest {
    fn from_request(req: &Request<Body>) -> Self {
        let header = |name: http::header::HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };
        RecordedRequest {
            path: req.uri().path().to_string(),
            query: req.uri().query().map(|q| q.to_string()),
            host: header(http::header::HOST).unwrap_or_default(),
            authorization: header(http::header::AUTHORIZATION),
            accept: header(http::header::ACCEPT),
        }
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query.as_ref().and_then(|q| {
            q.split('&').find_map(|pair| {
                let (k, v) = pair.split_once('=')?;
                (k == name).then(|| v.to_string())
            })
        })
    }

    /// `Www-Authenticate` value pointing back at this server's token realm.
    pub fn challenge(&self, scope: &str) -> String {
        format!(
            "Bearer realm=\"http://{}/token\",service=\"test-registry\",scope=\"{}\"",
            self.host, scope
        )
    }
}

#[derive(Debug, Clone)]
pub struct Reply {
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: String,
    delay: Option<Duration>,
}

impl Reply {
    pub fn status(status: u16) -> Self {
        Reply {
            status,
            headers: Vec::new(),
            body: String::new(),
            delay: None,
        }
    }

    pub fn json(value: serde_json::Value) -> Self {
        Reply::status(200)
            .header("content-type", "application/json")
            .body(value.to_string())
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn into_response(self) -> Response<Body> {
        let mut builder = Response::builder().status(self.status);
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }
        builder
            .body(Body::from(self.body))
            .expect("Should build fake registry response")
    }
}

/// A registry and token realm on one local port, answering through `handler`.
pub struct FakeRegistry {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeRegistry {
    pub async fn start<F>(handler: F) -> FakeRegistry
    where
        F: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::default();

        let recorded = requests.clone();
        let make_svc = make_service_fn(move |_conn| {
            let handler = handler.clone();
            let recorded = recorded.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                    let handler = handler.clone();
                    let recorded = recorded.clone();
                    async move {
                        let request = RecordedRequest::from_request(&req);
                        recorded.lock().unwrap().push(request.clone());
                        let reply = handler(&request);
                        if let Some(delay) = reply.delay {
                            tokio::time::sleep(delay).await;
                        }
                        Ok::<_, Infallible>(reply.into_response())
                    }
                }))
            }
        });

        let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
        let addr = server.local_addr();
        tokio::spawn(server);

        FakeRegistry { addr, requests }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }
}
