//! Resource types and helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use nuagerest::{Exposable, ExposedObject, Identity, Rootable, Session, SessionConfig};
use serde::{Deserialize, Serialize};
use wiremock::MockServer;

pub const ROOT: Identity = Identity::new("root", "root");
pub const ENTERPRISE: Identity = Identity::new("enterprise", "enterprises");
pub const USER: Identity = Identity::new("user", "users");

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Root {
    #[serde(flatten)]
    pub base: ExposedObject,
    #[serde(rename = "APIKey", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Root {
    pub fn new() -> Self {
        Self {
            base: ExposedObject::with_identity(ROOT),
            api_key: None,
        }
    }
}

impl Exposable for Root {
    fn exposed(&self) -> &ExposedObject {
        &self.base
    }

    fn exposed_mut(&mut self) -> &mut ExposedObject {
        &mut self.base
    }

    fn is_root(&self) -> bool {
        true
    }
}

impl Rootable for Root {
    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    fn set_api_key(&mut self, key: Option<String>) {
        self.api_key = key;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enterprise {
    #[serde(flatten)]
    pub base: ExposedObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Enterprise {
    pub fn new(id: Option<&str>) -> Self {
        let mut enterprise = Self {
            base: ExposedObject::with_identity(ENTERPRISE),
            ..Default::default()
        };
        enterprise.set_identifier(id.map(str::to_string));
        enterprise
    }
}

impl Exposable for Enterprise {
    fn exposed(&self) -> &ExposedObject {
        &self.base
    }

    fn exposed_mut(&mut self) -> &mut ExposedObject {
        &mut self.base
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(flatten)]
    pub base: ExposedObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

impl User {
    pub fn new(id: Option<&str>) -> Self {
        let mut user = Self {
            base: ExposedObject::with_identity(USER),
            ..Default::default()
        };
        user.set_identifier(id.map(str::to_string));
        user
    }
}

impl Exposable for User {
    fn exposed(&self) -> &ExposedObject {
        &self.base
    }

    fn exposed_mut(&mut self) -> &mut ExposedObject {
        &mut self.base
    }
}

/// `XREST base64(username:key)`.
pub fn xrest(username: &str, key: &str) -> String {
    format!("XREST {}", BASE64.encode(format!("{username}:{key}")))
}

/// A session against the mock server, not started.
pub fn session(server: &MockServer) -> Arc<Session<Root>> {
    let config = SessionConfig::new("username", "password", "organization", server.uri());
    Arc::new(Session::new(config, Root::new()).expect("valid session config"))
}
