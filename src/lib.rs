//! XREST API client library.
//!
//! Exposes a resource-oriented REST API as typed local objects. A
//! [`Session`] authenticates against the API root and carries out entity
//! operations (fetch, save, delete, children navigation), while a
//! [`PushCenter`] long-polls the events endpoint and hands server-side
//! changes to registered handlers.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use nuagerest::{Exposable, ExposedObject, Identity, PushCenter, Rootable, Session, SessionConfig};
//! use serde::{Deserialize, Serialize};
//!
//! const ME: Identity = Identity::new("me", "me");
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Me {
//!     #[serde(flatten)]
//!     base: ExposedObject,
//!     #[serde(rename = "APIKey", default)]
//!     api_key: Option<String>,
//! }
//!
//! impl Exposable for Me {
//!     fn exposed(&self) -> &ExposedObject { &self.base }
//!     fn exposed_mut(&mut self) -> &mut ExposedObject { &mut self.base }
//!     fn is_root(&self) -> bool { true }
//! }
//!
//! impl Rootable for Me {
//!     fn api_key(&self) -> Option<&str> { self.api_key.as_deref() }
//!     fn set_api_key(&mut self, key: Option<String>) { self.api_key = key; }
//! }
//!
//! #[tokio::main]
//! async fn main() -> nuagerest::Result<()> {
//!     let root = Me { base: ExposedObject::with_identity(ME), api_key: None };
//!     let session = Arc::new(Session::new(SessionConfig::from_env()?, root)?);
//!     session.start().await?;
//!
//!     let push_center = PushCenter::new(Arc::clone(&session));
//!     push_center.register_handler(Identity::ALL, |event| {
//!         println!("{} {}", event.event_type, event.entity_type);
//!     });
//!     push_center.start()?;
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     push_center.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! [`SessionConfig::from_env`] reads:
//!
//! - `NUAGE_USERNAME`, `NUAGE_PASSWORD`, `NUAGE_ORGANIZATION` (required)
//! - `NUAGE_API_URL` (optional) - Base URL of the API

pub mod cli;
mod error;
mod fetching;
mod identity;
mod notification;
mod object;
mod operations;
mod push_center;
mod request;
mod response;
mod session;
mod transport;

// Re-export core types
pub use error::{ConflictError, ErrorDescription, NuageError, Result};
pub use fetching::{prepare_headers, FetchingInfo, DEFAULT_PAGE_SIZE};
pub use identity::Identity;
pub use notification::{Event, Notification};
pub use object::{Exposable, ExposedObject, Rootable};
pub use push_center::{EventHandler, PushCenter, EVENT_CURSOR_PARAMETER};
pub use request::{Request, RESPONSE_CHOICE_PARAMETER};
pub use response::{codes, Payload, Response};
pub use session::{Session, SessionConfig};
pub use transport::{HttpTransport, Transport};

/// Header names exchanged with the server.
pub mod headers {
    pub use crate::fetching::{
        HEADER_ATTRIBUTES as ATTRIBUTES, HEADER_COUNT as COUNT, HEADER_FILTER as FILTER,
        HEADER_FILTER_TYPE as FILTER_TYPE, HEADER_GROUP_BY as GROUP_BY,
        HEADER_ORDER_BY as ORDER_BY, HEADER_PAGE as PAGE, HEADER_PAGE_SIZE as PAGE_SIZE,
    };
    pub use crate::session::{
        HEADER_AUTHORIZATION as AUTHORIZATION, HEADER_CONTENT_TYPE as CONTENT_TYPE,
        HEADER_ORGANIZATION as ORGANIZATION,
    };
}
