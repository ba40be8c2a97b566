//! Templates for the configured archive and entry values.
//!
//! A template is literal text with `$variable` references evaluated against
//! the current request and the captures of the route pattern that matched it:
//!
//! | Variable | Value |
//! |---|---|
//! | `$1` .. `$9` | numbered capture of the route pattern |
//! | `$name`, `${name}` | named capture of the route pattern |
//! | `$uri` | percent-decoded request path, dot segments resolved |
//! | `$request_uri` | raw path and query |
//! | `$args` | raw query string |
//! | `$arg_<name>` | percent-decoded query parameter |
//! | `$http_<name>` | request header, `_` standing for `-` |
//! | `$host` | host name without port |
//! | `$request_method` | request method |
//!
//! `$$` produces a literal `$`. Variables without a value evaluate to empty
//! text.

use percent_encoding::percent_decode_str;
use regex::Captures;

use crate::error::ConfigError;
use crate::request::RequestInfo;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(usize),
    NamedCapture(String),
    Uri,
    RequestUri,
    Args,
    Arg(String),
    Header(String),
    Host,
    Method,
}

/// A parsed template.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidTemplate {
            template: source.to_string(),
            message: message.to_string(),
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                literal.push(c);
                continue;
            }

            let name = match chars.peek().copied() {
                Some('$') => {
                    chars.next();
                    literal.push('$');
                    continue;
                }
                Some('{') => {
                    chars.next();
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => return Err(invalid("unterminated ${")),
                        }
                    }
                    name
                }
                // Numbered captures take a single digit, so "$10" is "$1" then "0"
                Some(d) if d.is_ascii_digit() => {
                    chars.next();
                    d.to_string()
                }
                Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            name.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    name
                }
                _ => return Err(invalid("'$' must be followed by a variable name")),
            };

            if name.is_empty() {
                return Err(invalid("empty variable name"));
            }
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(variable(&name).ok_or_else(|| invalid("invalid variable name"))?);
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Highest numbered capture the template refers to
    pub fn max_capture(&self) -> Option<usize> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Capture(i) => Some(*i),
                _ => None,
            })
            .max()
    }

    /// Names of the named captures the template refers to
    pub fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::NamedCapture(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Evaluate against a request.
    ///
    /// Fails when the result is empty or a decoded value is not valid UTF-8.
    pub fn evaluate(
        &self,
        req: &RequestInfo,
        captures: Option<&Captures<'_>>,
    ) -> Result<String, ConfigError> {
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Capture(i) => {
                    if let Some(m) = captures.and_then(|c| c.get(*i)) {
                        out.push_str(m.as_str());
                    }
                }
                Segment::NamedCapture(name) => {
                    if let Some(m) = captures.and_then(|c| c.name(name)) {
                        out.push_str(m.as_str());
                    }
                }
                Segment::Uri => {
                    let path = req.decoded_path().ok_or_else(|| ConfigError::InvalidPath {
                        path: req.path().to_string(),
                    })?;
                    out.push_str(&path);
                }
                Segment::RequestUri => out.push_str(req.request_uri()),
                Segment::Args => out.push_str(req.query().unwrap_or("")),
                Segment::Arg(name) => {
                    if let Some(value) = req.raw_query_param(name) {
                        out.push_str(&self.decode(value)?);
                    }
                }
                Segment::Header(name) => out.push_str(req.header(name).unwrap_or("")),
                Segment::Host => out.push_str(req.host().unwrap_or("")),
                Segment::Method => out.push_str(req.method.as_str()),
            }
        }

        if out.is_empty() {
            return Err(ConfigError::EmptyValue {
                template: self.source.clone(),
            });
        }
        Ok(out)
    }

    fn decode(&self, raw: &str) -> Result<String, ConfigError> {
        percent_decode_str(raw)
            .decode_utf8()
            .map(|s| s.into_owned())
            .map_err(|_| ConfigError::InvalidEncoding {
                template: self.source.clone(),
            })
    }
}

fn variable(name: &str) -> Option<Segment> {
    if let Ok(index) = name.parse::<usize>() {
        return Some(Segment::Capture(index));
    }
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let segment = match name {
        "uri" => Segment::Uri,
        "request_uri" => Segment::RequestUri,
        "args" | "query_string" => Segment::Args,
        "host" => Segment::Host,
        "request_method" => Segment::Method,
        _ => {
            if let Some(arg) = name.strip_prefix("arg_") {
                if arg.is_empty() {
                    return None;
                }
                Segment::Arg(arg.to_string())
            } else if let Some(header) = name.strip_prefix("http_") {
                if header.is_empty() {
                    return None;
                }
                Segment::Header(header.to_ascii_lowercase().replace('_', "-"))
            } else if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                Segment::NamedCapture(name.to_string())
            } else {
                return None;
            }
        }
    };
    Some(segment)
}
