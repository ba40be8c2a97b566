//! Dispatch of requests to the handler of the first matching route.

use crate::archive::ArchiveBackend;
use crate::config::ServerConfig;
use crate::error::ConfigError;
use crate::handler::ExtractionHandler;
use crate::request::RequestInfo;
use crate::resolver::Route;

pub struct Router<B> {
    handlers: Vec<ExtractionHandler<Route, B>>,
}

impl<B: ArchiveBackend + Clone> Router<B> {
    /// Build one handler per configured route, all sharing `backend`
    pub fn from_config(config: &ServerConfig, backend: B) -> Result<Self, ConfigError> {
        let handlers = config
            .build_routes()?
            .into_iter()
            .map(|route| {
                ExtractionHandler::new(route, backend.clone())
                    .with_max_entry_size(config.max_entry_size)
            })
            .collect();
        Ok(Self { handlers })
    }
}

impl<B: ArchiveBackend> Router<B> {
    pub fn new(handlers: Vec<ExtractionHandler<Route, B>>) -> Self {
        Self { handlers }
    }

    /// Handler for the first route whose pattern matches the request path
    pub fn find(&self, req: &RequestInfo) -> Option<&ExtractionHandler<Route, B>> {
        self.handlers.iter().find(|h| h.resolver().matches(req))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
