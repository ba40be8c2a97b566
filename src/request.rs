//! Request attributes visible to the handler and the template language.

use http::header::HOST;
use http::{HeaderMap, HeaderValue, Method, Request, Uri};
use percent_encoding::percent_decode_str;

/// The parts of an HTTP request the handler needs.
///
/// The body is never consulted, so it is not carried.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestInfo {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
        }
    }

    pub fn from_request<B>(req: &Request<B>) -> Self {
        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            headers: req.headers().clone(),
        }
    }

    /// Builder-style header insertion; values that are not valid header text are ignored
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// GET and HEAD are the only methods the handler serves
    pub fn is_retrieval(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    /// Raw, still percent-encoded path
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Percent-decoded path with `.` and `..` segments resolved and repeated
    /// slashes merged.
    ///
    /// `None` if the decoded bytes are not UTF-8 or the path climbs above the
    /// root. Routes and templates only ever see this form.
    pub fn decoded_path(&self) -> Option<String> {
        let decoded = percent_decode_str(self.path()).decode_utf8().ok()?;
        normalize_path(&decoded)
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Path followed by `?query` when present
    pub fn request_uri(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| self.path())
    }

    /// First query parameter called `name`, still percent-encoded
    pub fn raw_query_param(&self, name: &str) -> Option<&str> {
        self.query()?.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (key == name).then_some(value)
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Host name from the Host header or the request target, without port
    pub fn host(&self) -> Option<&str> {
        let authority = self.header(HOST.as_str()).or_else(|| self.uri.host())?;
        let host = if authority.starts_with('[') {
            authority
                .find(']')
                .map(|end| &authority[..=end])
                .unwrap_or(authority)
        } else {
            authority.split(':').next().unwrap_or(authority)
        };
        Some(host)
    }
}

fn normalize_path(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            segment => segments.push(segment),
        }
    }

    let mut normalized = String::with_capacity(path.len());
    for segment in &segments {
        normalized.push('/');
        normalized.push_str(segment);
    }
    let directory = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");
    if normalized.is_empty() || directory {
        normalized.push('/');
    }
    Some(normalized)
}
