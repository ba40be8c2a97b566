//! # zipserve
//!
//! An HTTP server that serves individual files extracted on demand from ZIP
//! archives, without unpacking the archives to disk.
//!
//! For every request, the matching route's templates are evaluated into an
//! archive path and an entry name. The archive is opened, the entry is looked
//! up and decompressed fully into memory, and the bytes are returned with a
//! `Content-Type` guessed from the entry name.
//!
//! ## Features
//!
//! - Per-route archive and entry templates built from captures, query
//!   parameters and headers, with server level defaults
//! - Local archives and remote archives read with HTTP Range requests
//! - ZIP64, STORED and DEFLATE entries, CRC-32 verification
//! - No state shared between requests: each request opens its own archive
//!
//! ## Status codes
//!
//! | Condition | Status |
//! |---|---|
//! | Method other than GET/HEAD | 405 |
//! | Archive missing or unreadable, entry missing | 404 |
//! | Entry too large, corrupt, or unsupported | 500 |
//! | Configuration values unresolvable | connection closed, no response |
//!
//! ## Example
//!
//! ```no_run
//! use zipserve::{Router, Server, ServerConfig, ZipBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_yaml(r#"
//! routes:
//!   - pattern: "^/docs/(.+)$"
//!     archive: "/srv/docs.zip"
//!     extract: "$1"
//! "#)?;
//!
//!     let router = Router::from_config(&config, ZipBackend::new()?)?;
//!     let server = Server::bind(config.listen_addr()?, router).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod io;
pub mod request;
pub mod resolver;
pub mod router;
pub mod server;
pub mod template;
pub mod zip;

pub use archive::{ArchiveBackend, ArchiveHandle, EntryStat, EntryStream};
pub use cli::Cli;
pub use config::{RouteConfig, ServerConfig};
pub use error::{ArchiveError, ConfigError, ExtractError, HandlerError};
pub use handler::{ExtractedContent, ExtractionHandler};
pub use io::{HttpRangeReader, LocalFileReader, ReadAt};
pub use request::RequestInfo;
pub use resolver::{ConfigResolver, ResolvedPaths, Route};
pub use router::Router;
pub use server::Server;
pub use template::Template;
pub use zip::{ZipBackend, ZipFileEntry};
