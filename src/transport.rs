//! Outgoing server queries and the transports that carry them.
//!
//! A [`Transport`] takes an [`ApiRequest`] and eventually sends exactly one
//! [`ApiReply`] into the channel it was given.  Replies are applied by the
//! controller on the UI thread, so a transport may answer from any thread.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;

use crate::error::RequestError;

/// Server endpoint a request targets.  Ordering is tracked per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKind {
    Info,
    Context,
    Match,
    Search,
}

impl QueryKind {
    pub fn path(self) -> &'static str {
        match self {
            QueryKind::Info => "info",
            QueryKind::Context => "context",
            QueryKind::Match => "match",
            QueryKind::Search => "search",
        }
    }
}

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub kind: QueryKind,
    pub seq: u64,
}

/// A GET request against the API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub ticket: Ticket,
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(ticket: Ticket) -> Self {
        Self {
            ticket,
            params: Vec::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params.push((name.to_string(), value.into()));
        self
    }

    pub fn kind(&self) -> QueryKind {
        self.ticket.kind
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Full URL below `base` (e.g. `http://localhost:8888/api/v2`).
    pub fn url(&self, base: &str) -> Result<Url, RequestError> {
        let base = format!("{}/", base.trim_end_matches('/'));
        let mut url = Url::parse(&base)
            .and_then(|u| u.join(self.ticket.kind.path()))
            .map_err(|e| RequestError::InvalidUrl(e.to_string()))?;
        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(self.params.iter());
        }
        Ok(url)
    }
}

/// Outcome of one request: the raw body or the failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub ticket: Ticket,
    pub body: Result<Vec<u8>, RequestError>,
}

/// Carries requests to the server.
pub trait Transport {
    fn send(&mut self, request: ApiRequest, reply: Sender<ApiReply>);
}

/// Transport over HTTP.  Each request runs on its own worker thread with a
/// shared blocking `reqwest` client.
pub struct HttpTransport {
    base_url: String,
    client: Client,
    on_reply: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RequestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RequestError::Network(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
            on_reply: None,
        })
    }

    /// Called after each reply was queued, e.g. to wake the UI.
    pub fn on_reply(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_reply = Some(Arc::new(f));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn fetch(client: &Client, url: Url) -> Result<Vec<u8>, RequestError> {
    let resp = client
        .get(url)
        .send()
        .map_err(|e| RequestError::Network(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(RequestError::Status {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or_default().to_string(),
        });
    }
    resp.bytes()
        .map(|b| b.to_vec())
        .map_err(|e| RequestError::Network(e.to_string()))
}

impl Transport for HttpTransport {
    fn send(&mut self, request: ApiRequest, reply: Sender<ApiReply>) {
        let ticket = request.ticket;
        let url = match request.url(&self.base_url) {
            Ok(url) => url,
            Err(e) => {
                let _ = reply.send(ApiReply { ticket, body: Err(e) });
                return;
            }
        };
        log::debug!("GET {}", url);
        let client = self.client.clone();
        let on_reply = self.on_reply.clone();
        std::thread::spawn(move || {
            let body = fetch(&client, url);
            let _ = reply.send(ApiReply { ticket, body });
            if let Some(f) = on_reply {
                f();
            }
        });
    }
}

/// Transport that only records requests; replies are delivered by hand.
///
/// Clones share the same record, so a test can keep one handle while the
/// controller owns another.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Rc<RefCell<Vec<(ApiRequest, Sender<ApiReply>)>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sent.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.borrow().is_empty()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.sent.borrow().iter().map(|(r, _)| r.clone()).collect()
    }

    /// Requests of one kind, oldest first.
    pub fn requests_of(&self, kind: QueryKind) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.kind() == kind)
            .collect()
    }

    pub fn last(&self, kind: QueryKind) -> Option<ApiRequest> {
        self.requests_of(kind).pop()
    }

    /// Answer the request holding `ticket`.  Returns false if it is unknown.
    pub fn respond(&self, ticket: Ticket, body: Result<Vec<u8>, RequestError>) -> bool {
        let sent = self.sent.borrow();
        let Some((_, tx)) = sent.iter().find(|(r, _)| r.ticket == ticket) else {
            return false;
        };
        tx.send(ApiReply { ticket, body }).is_ok()
    }

    /// Answer with a JSON body.
    pub fn respond_json(&self, ticket: Ticket, json: &str) -> bool {
        self.respond(ticket, Ok(json.as_bytes().to_vec()))
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, request: ApiRequest, reply: Sender<ApiReply>) {
        self.sent.borrow_mut().push((request, reply));
    }
}
