//! Capability traits implemented by resource types.
//!
//! Resource types are usually generated from the API description. Each one
//! embeds an [`ExposedObject`] (flattened into its JSON) and implements
//! [`Exposable`], which is all the session needs to derive URLs and move the
//! object over the wire.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{NuageError, Result};
use crate::identity::Identity;

/// Fields shared by every object exposed through the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposedObject {
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(rename = "parentType", default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Resource type. Never sent over the wire.
    #[serde(skip)]
    pub identity: Identity,
}

impl ExposedObject {
    /// An empty object of the given type.
    pub fn with_identity(identity: Identity) -> Self {
        Self {
            identity,
            ..Default::default()
        }
    }
}

/// An object that can be fetched, saved and deleted through a session.
pub trait Exposable: Serialize + DeserializeOwned + Send + Sync {
    fn exposed(&self) -> &ExposedObject;

    fn exposed_mut(&mut self) -> &mut ExposedObject;

    /// True for the root resource of the API (e.g. `/me`).
    ///
    /// The root has no ID in its URL and its children hang directly off the
    /// base URL.
    fn is_root(&self) -> bool {
        false
    }

    fn identity(&self) -> Identity {
        self.exposed().identity
    }

    fn set_identity(&mut self, identity: Identity) {
        self.exposed_mut().identity = identity;
    }

    fn identifier(&self) -> Option<&str> {
        self.exposed().id.as_deref()
    }

    fn set_identifier(&mut self, id: Option<String>) {
        self.exposed_mut().id = id;
    }

    /// URL of the collection this object belongs to.
    fn general_url(&self, base_url: &str) -> Result<String> {
        let identity = self.identity();
        if identity.is_empty() {
            return Err(NuageError::MissingIdentity);
        }
        Ok(format!("{base_url}/{}", identity.resource_name))
    }

    /// URL of this very object.
    fn personal_url(&self, base_url: &str) -> Result<String> {
        if self.is_root() {
            return self.general_url(base_url);
        }

        let id = self
            .identifier()
            .filter(|id| !id.is_empty())
            .ok_or(NuageError::MissingIdentifier {
                rest_name: self.identity().rest_name,
            })?;
        Ok(format!("{}/{id}", self.general_url(base_url)?))
    }

    /// URL of this object's children of the given type.
    fn url_for_children(&self, base_url: &str, identity: Identity) -> Result<String> {
        if self.is_root() {
            return Ok(format!("{base_url}/{}", identity.resource_name));
        }
        Ok(format!(
            "{}/{}",
            self.personal_url(base_url)?,
            identity.resource_name
        ))
    }
}

/// The root resource an authenticated session hangs off.
///
/// Fetching it is the authentication step: the server answers with the API
/// key to use for the following calls.
pub trait Rootable: Exposable {
    fn api_key(&self) -> Option<&str>;

    fn set_api_key(&mut self, key: Option<String>);
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: Identity = Identity::new("root", "root");
    const FAKE: Identity = Identity::new("fake", "fakes");

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Fake {
        #[serde(flatten)]
        base: ExposedObject,
        #[serde(default)]
        name: String,
    }

    impl Exposable for Fake {
        fn exposed(&self) -> &ExposedObject {
            &self.base
        }

        fn exposed_mut(&mut self) -> &mut ExposedObject {
            &mut self.base
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Root {
        #[serde(flatten)]
        base: ExposedObject,
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

    #[test]
    fn test_root_urls() {
        let root = Root {
            base: ExposedObject::with_identity(ROOT),
        };
        assert_eq!(root.personal_url("http://url.com").unwrap(), "http://url.com/root");
        assert_eq!(root.general_url("http://url.com").unwrap(), "http://url.com/root");
        assert_eq!(
            root.url_for_children("http://url.com", FAKE).unwrap(),
            "http://url.com/fakes"
        );
    }

    #[test]
    fn test_object_urls() {
        let mut fake = Fake {
            base: ExposedObject::with_identity(FAKE),
            ..Default::default()
        };
        fake.set_identifier(Some("xxx".to_string()));

        assert_eq!(fake.personal_url("http://url.com").unwrap(), "http://url.com/fakes/xxx");
        assert_eq!(fake.general_url("http://url.com").unwrap(), "http://url.com/fakes");
        assert_eq!(
            fake.url_for_children("http://url.com", ROOT).unwrap(),
            "http://url.com/fakes/xxx/root"
        );
    }

    #[test]
    fn test_object_without_id() {
        let fake = Fake {
            base: ExposedObject::with_identity(FAKE),
            ..Default::default()
        };
        assert!(fake.general_url("http://url.com").is_ok());
        assert!(matches!(
            fake.personal_url("http://url.com"),
            Err(NuageError::MissingIdentifier { rest_name: "fake" })
        ));
    }

    #[test]
    fn test_object_without_identity() {
        let fake = Fake::default();
        assert!(matches!(
            fake.general_url("http://url.com"),
            Err(NuageError::MissingIdentity)
        ));
        assert!(fake.personal_url("http://url.com").is_err());
    }

    #[test]
    fn test_wire_format() {
        let fake: Fake =
            serde_json::from_str(r#"{"ID": "1", "parentID": "2", "parentType": "pedro", "name": "n"}"#)
                .unwrap();
        assert_eq!(fake.identifier(), Some("1"));
        assert_eq!(fake.base.parent_type.as_deref(), Some("pedro"));
        assert!(fake.identity().is_empty());

        let json = serde_json::to_value(&fake).unwrap();
        assert_eq!(json["ID"], "1");
        assert!(json.get("owner").is_none());
    }
}
