//! An in-process stand-in for the Kubernetes API server.

// Third Party
use hyper::{body::to_bytes, Body};
use kube::Client;
use serde::Serialize;
use serde_json::json;
use tokio::task::JoinHandle;

// Local
use super::DEFAULT_NAMESPACE;

pub type ApiServerHandle = tower_test::mock::Handle<http::Request<Body>, http::Response<Body>>;

/// The parts of a client request the tests look at.
#[derive(Debug)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: String,
    pub body: Vec<u8>,
}

impl Request {
    async fn from_request(request: http::Request<Body>) -> Result<Self, anyhow::Error> {
        let method = request.method().to_string();
        let path = request.uri().path().to_string();
        let query = request.uri().query().unwrap_or_default().to_string();
        let body = to_bytes(request.into_body()).await?.to_vec();
        Ok(Self {
            method,
            path,
            query,
            body,
        })
    }
}

pub struct Reply {
    status: u16,
    body: Vec<u8>,
}

impl Reply {
    pub fn object<T: Serialize>(object: &T) -> Self {
        Self {
            status: 200,
            body: serde_json::to_vec(object).unwrap(),
        }
    }

    pub fn list<T: Serialize>(kind: &str, items: &[T], continue_token: Option<&str>) -> Self {
        let list = json!({
            "apiVersion": "v1",
            "kind": kind,
            "metadata": {
                "resourceVersion": "1",
                "continue": continue_token,
            },
            "items": items,
        });
        Self {
            status: 200,
            body: serde_json::to_vec(&list).unwrap(),
        }
    }

    pub fn status(code: u16, reason: &str) -> Self {
        let status = json!({
            "apiVersion": "v1",
            "kind": "Status",
            "status": "Failure",
            "message": format!("stub {}", reason),
            "reason": reason,
            "code": code,
        });
        Self {
            status: code,
            body: serde_json::to_vec(&status).unwrap(),
        }
    }

    fn into_response(self) -> http::Response<Body> {
        http::Response::builder()
            .status(self.status)
            .body(Body::from(self.body))
            .unwrap()
    }
}

pub struct ApiServer(ApiServerHandle);

impl ApiServer {
    /// A client wired to a mock API server.
    pub fn new() -> (Client, Self) {
        let (mock_service, handle) =
            tower_test::mock::pair::<http::Request<Body>, http::Response<Body>>();
        let client = Client::new(mock_service, DEFAULT_NAMESPACE);
        (client, Self(handle))
    }

    /// Answer every request with `respond` until all clients are dropped.
    pub fn run<F>(mut self, mut respond: F) -> JoinHandle<()>
    where
        F: FnMut(Request) -> Reply + Send + 'static,
    {
        tokio::spawn(async move {
            while let Some((request, send)) = self.0.next_request().await {
                let request = Request::from_request(request)
                    .await
                    .expect("request should be readable");
                send.send_response(respond(request).into_response());
            }
        })
    }
}

pub async fn timeout_after_1s(handle: JoinHandle<()>) {
    tokio::time::timeout(std::time::Duration::from_secs(1), handle)
        .await
        .expect("timeout on mock apiserver")
        .expect("stub succeeded")
}
