//! Entity operations.
//!
//! CRUD on exposed objects and navigation between parents and children,
//! built on [`Session::send`].

use std::collections::HashSet;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{NuageError, Result};
use crate::fetching::{FetchingInfo, DEFAULT_PAGE_SIZE, HEADER_COUNT};
use crate::identity::Identity;
use crate::object::{Exposable, Rootable};
use crate::request::Request;
use crate::response::{Payload, Response};
use crate::session::Session;

/// Maximum pages walked by [`Session::fetch_all_children`].
const MAX_PAGES: u32 = 1000;

impl<R: Rootable + 'static> Session<R> {
    /// Refresh `object` from the server.
    ///
    /// Fields present in the answer overwrite the object's, the others are
    /// kept. An empty answer leaves the object untouched.
    #[tracing::instrument(skip_all, fields(identity = %object.identity()))]
    pub async fn fetch<T: Exposable>(&self, object: &mut T) -> Result<()> {
        let mut request = Request::new(object.personal_url(self.base_url())?);

        let response = self
            .send(&mut request, None)
            .await
            .inspect_err(|e| tracing::error!("Error during fetch: {}", e))?;

        merge_response(object, &response)
    }

    /// Save `object` to the server, then apply the server's answer to it.
    #[tracing::instrument(skip_all, fields(identity = %object.identity()))]
    pub async fn save<T: Exposable>(&self, object: &mut T) -> Result<()> {
        let body = serde_json::to_vec(&*object)?;
        let mut request = Request::new(object.personal_url(self.base_url())?)
            .with_method(Method::PUT)
            .with_body(body);

        let response = self
            .send(&mut request, None)
            .await
            .inspect_err(|e| tracing::error!("Error during save: {}", e))?;

        merge_response(object, &response)
    }

    /// Delete `object` from the server.
    #[tracing::instrument(skip_all, fields(identity = %object.identity()))]
    pub async fn delete<T: Exposable>(&self, object: &T) -> Result<()> {
        let mut request =
            Request::new(object.personal_url(self.base_url())?).with_method(Method::DELETE);

        self.send(&mut request, None)
            .await
            .inspect_err(|e| tracing::error!("Error during delete: {}", e))?;

        Ok(())
    }

    /// Fetch the children of `parent` with the given identity.
    ///
    /// `info` drives pagination and filtering and is filled back from the
    /// response, with the total count of children for instance. Every
    /// returned child carries `identity`.
    #[tracing::instrument(skip_all, fields(parent = %parent.identity(), identity = %identity))]
    pub async fn fetch_children<P, C>(
        &self,
        parent: &P,
        identity: Identity,
        info: Option<&mut FetchingInfo>,
    ) -> Result<Vec<C>>
    where
        P: Exposable,
        C: Exposable,
    {
        let mut request = Request::new(parent.url_for_children(self.base_url(), identity)?);

        let response = self
            .send(&mut request, info)
            .await
            .inspect_err(|e| tracing::error!("Error during fetch children: {}", e))?;

        decode_children(&response, identity)
    }

    /// Fetch every page of children, starting from the page in `info`.
    ///
    /// Filter, order and grouping of `info` apply to every page. Stops on a
    /// short page, once the reported total is reached, on a page made only
    /// of children already seen (a server ignoring the page header), or
    /// after a safety limit of pages.
    pub async fn fetch_all_children<P, C>(
        &self,
        parent: &P,
        identity: Identity,
        info: Option<FetchingInfo>,
    ) -> Result<Vec<C>>
    where
        P: Exposable,
        C: Exposable,
    {
        let template = info.unwrap_or_default();
        let page_size = template
            .page_size
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let mut page = template.page.unwrap_or(0);
        let mut all = Vec::new();
        let mut seen = HashSet::new();

        for _ in 0..MAX_PAGES {
            let mut info = FetchingInfo {
                page: Some(page),
                page_size: Some(page_size),
                ..template.clone()
            };

            let children: Vec<C> = self.fetch_children(parent, identity, Some(&mut info)).await?;
            let count = children.len();

            let fresh: Vec<C> = children
                .into_iter()
                .filter(|child| match child.identifier() {
                    Some(id) => seen.insert(id.to_string()),
                    None => true,
                })
                .collect();
            if count > 0 && fresh.is_empty() {
                tracing::warn!("Page {} repeats known children, stopping", page);
                return Ok(all);
            }
            all.extend(fresh);

            let total_reached = info.total_count > 0 && all.len() as u64 >= info.total_count;
            if count < page_size as usize || total_reached {
                return Ok(all);
            }
            page += 1;
        }

        tracing::warn!("Reached pagination limit of {} pages, stopping", MAX_PAGES);
        Ok(all)
    }

    /// Count the children of `parent` with the given identity without
    /// fetching them.
    #[tracing::instrument(skip_all, fields(parent = %parent.identity(), identity = %identity))]
    pub async fn count_children<P: Exposable>(
        &self,
        parent: &P,
        identity: Identity,
        info: Option<&mut FetchingInfo>,
    ) -> Result<u64> {
        let mut request = Request::new(parent.url_for_children(self.base_url(), identity)?)
            .with_method(Method::HEAD);

        let response = self
            .send(&mut request, info)
            .await
            .inspect_err(|e| tracing::error!("Error during count children: {}", e))?;

        Ok(response
            .header(HEADER_COUNT)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default())
    }

    /// Create `child` under `parent`.
    ///
    /// The server's answer is applied to `child`, which gets its ID this way.
    #[tracing::instrument(skip_all, fields(parent = %parent.identity(), identity = %child.identity()))]
    pub async fn create_child<P, C>(&self, parent: &P, child: &mut C) -> Result<()>
    where
        P: Exposable,
        C: Exposable,
    {
        let body = serde_json::to_vec(&*child)?;
        let mut request = Request::new(parent.url_for_children(self.base_url(), child.identity())?)
            .with_method(Method::POST)
            .with_body(body);

        let response = self
            .send(&mut request, None)
            .await
            .inspect_err(|e| tracing::error!("Error during create child: {}", e))?;

        merge_response(child, &response)
    }

    /// Replace the children of `parent` with the given identity by `children`.
    ///
    /// An empty slice detaches every child.
    ///
    /// # Errors
    ///
    /// Returns [`NuageError::MissingIdentifier`] before sending anything if
    /// one of the children has no ID.
    #[tracing::instrument(skip_all, fields(parent = %parent.identity(), identity = %identity, count = children.len()))]
    pub async fn assign_children<P, C>(
        &self,
        parent: &P,
        children: &[C],
        identity: Identity,
    ) -> Result<()>
    where
        P: Exposable,
        C: Exposable,
    {
        let ids = children
            .iter()
            .map(|child| {
                child.identifier().ok_or(NuageError::MissingIdentifier {
                    rest_name: child.identity().rest_name,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let body = serde_json::to_vec(&ids)?;
        let mut request = Request::new(parent.url_for_children(self.base_url(), identity)?)
            .with_method(Method::PUT)
            .with_body(body);

        self.send(&mut request, None)
            .await
            .inspect_err(|e| tracing::error!("Error during assign children: {}", e))?;

        Ok(())
    }
}

/// Apply the single object of `response` onto `object`.
///
/// JSON fields present in the answer replace the object's, absent ones are
/// kept, and the object's identity is preserved.
pub(crate) fn merge_response<T: Exposable>(object: &mut T, response: &Response) -> Result<()> {
    let update = match response.decode_single() {
        Ok(Payload::Value(value)) => value,
        Ok(Payload::Empty) => return Ok(()),
        Err(err) => {
            tracing::error!("Unable to decode response: {}", err);
            return Err(err);
        }
    };

    let identity = object.identity();
    let mut current = serde_json::to_value(&*object)?;
    merge_values(&mut current, update);

    *object = from_value(current)?;
    object.set_identity(identity);
    Ok(())
}

fn decode_children<C: Exposable>(response: &Response, identity: Identity) -> Result<Vec<C>> {
    let mut children: Vec<C> = match response.decode() {
        Ok(Payload::Value(children)) => children,
        Ok(Payload::Empty) => Vec::new(),
        Err(err) => {
            tracing::error!("Unable to decode children: {}", err);
            return Err(err);
        }
    };

    for child in &mut children {
        child.set_identity(identity);
    }
    Ok(children)
}

fn merge_values(target: &mut Value, update: Value) {
    match (target, update) {
        (Value::Object(target), Value::Object(update)) => {
            for (key, value) in update {
                target.insert(key, value);
            }
        }
        (target, update) => *target = update,
    }
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(NuageError::MalformedPayload)
}
