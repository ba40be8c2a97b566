//! Per-request resolution of the configured archive and entry values.

use regex::Regex;

use crate::error::ConfigError;
use crate::request::RequestInfo;
use crate::template::Template;

/// Archive and entry names resolved for one request.
///
/// Both values are non-empty and owned, independent of the request buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub archive_path: String,
    pub entry_path: String,
}

/// Turns a request into the archive and entry it asks for.
pub trait ConfigResolver: Send + Sync {
    fn resolve(&self, req: &RequestInfo) -> Result<ResolvedPaths, ConfigError>;
}

/// A configured route: a path pattern and the two templates evaluated for
/// requests matching it.
#[derive(Debug, Clone)]
pub struct Route {
    pattern: Regex,
    archive: Template,
    extract: Template,
}

impl Route {
    /// Compile a route, checking that every capture the templates use exists
    pub fn new(pattern: &str, archive: &str, extract: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        let archive = Template::parse(archive)?;
        let extract = Template::parse(extract)?;

        for template in [&archive, &extract] {
            if let Some(index) = template.max_capture() {
                if index >= regex.captures_len() {
                    return Err(ConfigError::InvalidTemplate {
                        template: template.source().to_string(),
                        message: format!(
                            "refers to capture ${} but {} has {} groups",
                            index,
                            pattern,
                            regex.captures_len() - 1
                        ),
                    });
                }
            }
            for name in template.capture_names() {
                if !regex.capture_names().flatten().any(|n| n == name) {
                    return Err(ConfigError::InvalidTemplate {
                        template: template.source().to_string(),
                        message: format!("unknown variable ${}", name),
                    });
                }
            }
        }

        Ok(Self {
            pattern: regex,
            archive,
            extract,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Whether this route serves the request's normalized path
    pub fn matches(&self, req: &RequestInfo) -> bool {
        req.decoded_path()
            .is_some_and(|path| self.pattern.is_match(&path))
    }
}

impl ConfigResolver for Route {
    fn resolve(&self, req: &RequestInfo) -> Result<ResolvedPaths, ConfigError> {
        let path = req.decoded_path().ok_or_else(|| ConfigError::InvalidPath {
            path: req.path().to_string(),
        })?;
        let captures = self
            .pattern
            .captures(&path)
            .ok_or_else(|| ConfigError::RouteMismatch(path.clone()))?;

        Ok(ResolvedPaths {
            archive_path: self.archive.evaluate(req, Some(&captures))?,
            entry_path: self.extract.evaluate(req, Some(&captures))?,
        })
    }
}
