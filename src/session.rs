//! Authenticated session.
//!
//! The session owns the credentials and the root resource, and is the only
//! way requests reach the server. [`Session::send`] injects the standard
//! headers and interprets the status code: success, redirect-choice retry,
//! conflict, authentication-expired retry, or a mapped error.

use std::any::Any;
use std::env;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use parking_lot::RwLock;
use tokio::sync::{Mutex, MutexGuard};
use url::Url;

use crate::error::{ConflictError, NuageError, Result};
use crate::fetching::{self, FetchingInfo};
use crate::object::Rootable;
use crate::operations::merge_response;
use crate::request::Request;
use crate::response::{codes, Payload, Response};
use crate::transport::{HttpTransport, Transport};

const DEFAULT_API_URL: &str = "https://localhost:8443/nuage/api/v6";

pub const HEADER_ORGANIZATION: &str = "X-Nuage-Organization";
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";

/// The session lookups resolve to when no handle is at hand.
static CURRENT: RwLock<Option<Arc<dyn Any + Send + Sync>>> = parking_lot::const_rwlock(None);

/// Connection parameters of a session.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub username: String,
    pub password: String,
    pub organization: String,
    pub url: String,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("username", &self.username)
            .field("organization", &self.organization)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl SessionConfig {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        organization: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            organization: organization.into(),
            url: url.into(),
        }
    }

    /// Read the configuration from environment variables.
    ///
    /// Uses `NUAGE_USERNAME`, `NUAGE_PASSWORD` and `NUAGE_ORGANIZATION`, and
    /// optionally `NUAGE_API_URL` for the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the required variables is not set.
    pub fn from_env() -> Result<Self> {
        let required = |name: &str| {
            env::var(name).map_err(|_| {
                NuageError::ConfigMissing(format!("{name} environment variable not set"))
            })
        };

        Ok(Self {
            username: required("NUAGE_USERNAME")?,
            password: required("NUAGE_PASSWORD")?,
            organization: required("NUAGE_ORGANIZATION")?,
            url: env::var("NUAGE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        })
    }
}

/// A user session against one API endpoint.
///
/// `R` is the root resource type; fetching it authenticates the session and
/// yields the API key used by every following call.
///
/// Sessions are shared as `Arc<Session<R>>`: entity operations and the push
/// center take the handle explicitly. The last started session is also
/// reachable through [`Session::current`].
pub struct Session<R> {
    username: String,
    password: String,
    organization: String,
    base_url: String,
    api_key: RwLock<Option<String>>,
    root: Mutex<R>,
    /// Where the root is fetched from; `None` if the root has no identity.
    root_url: Option<String>,
    transport: Arc<dyn Transport>,
}

impl<R> fmt::Debug for Session<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("organization", &self.organization)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl<R: Rootable + 'static> Session<R> {
    /// Create a session using the default HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// built.
    pub fn new(config: SessionConfig, root: R) -> Result<Self> {
        Self::with_transport(config, root, Arc::new(HttpTransport::new()?))
    }

    /// Create a session sending its requests through `transport`.
    pub fn with_transport(
        config: SessionConfig,
        root: R,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let parsed = Url::parse(&config.url)?;
        let base_url = parsed.as_str().trim_end_matches('/').to_string();
        let root_url = root.personal_url(&base_url).ok();

        Ok(Self {
            username: config.username,
            password: config.password,
            organization: config.organization,
            base_url,
            api_key: RwLock::new(None),
            root: Mutex::new(root),
            root_url,
            transport,
        })
    }

    /// The session most recently started, if any and if it has root type `R`.
    pub fn current() -> Option<Arc<Self>> {
        let current = CURRENT.read().clone()?;
        current.downcast::<Self>().ok()
    }

    /// Base URL of the API, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn api_key(&self) -> Option<String> {
        self.api_key.read().clone()
    }

    /// Lock the root resource.
    ///
    /// The guard may be held across entity operations, the root included.
    /// While it is held, a renewed API key is only recorded on the session,
    /// not on the root.
    pub async fn root(&self) -> MutexGuard<'_, R> {
        self.root.lock().await
    }

    /// Compute the `Authorization` header value.
    ///
    /// The API key is used once known, the password otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`NuageError::ConfigMissing`] if the username is empty or if
    /// neither a password nor an API key is available.
    pub fn authorization_header(&self) -> Result<String> {
        if self.username.is_empty() {
            return Err(NuageError::ConfigMissing(
                "username must be set".to_string(),
            ));
        }

        let api_key = self.api_key.read();
        let key = match api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ if !self.password.is_empty() => self.password.as_str(),
            _ => {
                return Err(NuageError::ConfigMissing(
                    "password or API key must be set".to_string(),
                ))
            }
        };

        let credentials = format!("{}:{key}", self.username);
        Ok(format!("XREST {}", BASE64.encode(credentials)))
    }

    /// Start the session.
    ///
    /// Fetches the root resource to authenticate, stores its API key and
    /// makes this session the current one, replacing any other.
    ///
    /// # Errors
    ///
    /// Returns the error of the authentication fetch.
    #[tracing::instrument(skip(self), fields(username = %self.username, url = %self.base_url))]
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        if let Err(err) = self.authenticate().await {
            tracing::error!("Error during authentication: {}", err);
            return Err(err);
        }

        let previous = CURRENT
            .write()
            .replace(Arc::clone(self) as Arc<dyn Any + Send + Sync>);
        if previous.is_some() {
            tracing::debug!("Replaced the current session");
        }

        tracing::info!("Session started");
        Ok(())
    }

    /// Reset the session.
    ///
    /// Forgets the API key and, if this session is the current one, clears
    /// the current session.
    pub async fn reset(self: &Arc<Self>) {
        *self.api_key.write() = None;
        self.root.lock().await.set_api_key(None);

        let mut current = CURRENT.write();
        let this = Arc::as_ptr(self).cast::<()>();
        let is_current = current
            .as_ref()
            .is_some_and(|c| std::ptr::eq(Arc::as_ptr(c).cast::<()>(), this));
        if is_current {
            *current = None;
        }

        tracing::info!("Session reset");
    }

    /// Send a request with the session credentials.
    ///
    /// Pagination headers come from `info`, and on success the response
    /// headers are read back into it.
    ///
    /// A 300 answer is retried with `responseChoice=1`, a 419 answer triggers
    /// one re-authentication and one resend. Other non-success codes become
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns [`NuageError::Conflict`] for 409, [`NuageError::Api`] for the
    /// other error codes, the transport error if the exchange failed, and the
    /// re-authentication error if renewing an expired session failed.
    pub async fn send(
        &self,
        request: &mut Request,
        info: Option<&mut FetchingInfo>,
    ) -> Result<Response> {
        self.send_with(request, info, true).await
    }

    #[tracing::instrument(skip_all, fields(method = %request.method, url = %request.url))]
    async fn send_with(
        &self,
        request: &mut Request,
        mut info: Option<&mut FetchingInfo>,
        allow_reauthentication: bool,
    ) -> Result<Response> {
        let mut reauthenticated = !allow_reauthentication;

        loop {
            request.set_header(HEADER_ORGANIZATION, self.organization.as_str());
            request.set_header(HEADER_AUTHORIZATION, self.authorization_header()?);
            request.set_header(HEADER_CONTENT_TYPE, "application/json");
            fetching::prepare_headers(request, info.as_deref());

            let response = self.transport.send(request).await?;

            match response.code {
                codes::SUCCESS | codes::CREATED | codes::EMPTY => {
                    if let Some(info) = info.as_deref_mut() {
                        info.read_headers(&response);
                    }
                    return Ok(response);
                }
                codes::MULTIPLE_CHOICES => {
                    tracing::debug!("Multiple choices, resending with responseChoice");
                    request.choose_response();
                }
                codes::CONFLICT => {
                    let conflict = ConflictError::from_body(response.code, &response.body);
                    return Err(conflict.into());
                }
                codes::AUTHENTICATION_EXPIRED if !reauthenticated => {
                    tracing::warn!("Authentication expired, renewing API key");
                    reauthenticated = true;
                    self.invalidate_api_key();
                    self.authenticate().await?;
                }
                code => return Err(NuageError::from_status(code)),
            }
        }
    }

    /// Fetch the root resource and adopt its API key.
    ///
    /// Never waits on the root lock: the caller may hold it while sending.
    /// The answer is merged into the root when the lock is free, otherwise
    /// only the API key is taken from it.
    ///
    /// Boxed because it re-enters `send_with`.
    fn authenticate(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let url = self.root_url.clone().ok_or(NuageError::MissingIdentity)?;
            let mut request = Request::new(url);
            let response = self.send_with(&mut request, None, false).await?;

            let api_key = match self.root.try_lock() {
                Ok(mut root) => {
                    merge_response(&mut *root, &response)?;
                    root.api_key().map(str::to_string)
                }
                Err(_) => {
                    tracing::debug!("Root resource in use, taking the API key only");
                    let fresh = decode_root::<R>(&response)?;
                    fresh.and_then(|root| root.api_key().map(str::to_string))
                }
            };

            *self.api_key.write() = api_key;
            Ok(())
        })
    }

    fn invalidate_api_key(&self) {
        *self.api_key.write() = None;
        if let Ok(mut root) = self.root.try_lock() {
            root.set_api_key(None);
        }
    }
}

/// Decode the single root object of an authentication answer.
fn decode_root<R: Rootable>(response: &Response) -> Result<Option<R>> {
    match response.decode_single()? {
        Payload::Value(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(NuageError::MalformedPayload),
        Payload::Empty => Ok(None),
    }
}
