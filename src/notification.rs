//! Push notifications and the events they carry.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NuageError, Result};

/// One poll answer of the events endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Cursor to send back on the next poll.
    #[serde(default)]
    pub uuid: String,

    #[serde(default)]
    pub events: Vec<Event>,
}

/// A change of one entity on the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// REST name of the changed entity, e.g. `enterprise`.
    #[serde(default)]
    pub entity_type: String,

    /// `CREATE`, `UPDATE`, `DELETE`...
    #[serde(rename = "type", default)]
    pub event_type: String,

    #[serde(default)]
    pub update_mechanism: String,

    /// Raw entity payloads as sent by the server.
    #[serde(default)]
    pub entities: Vec<Value>,

    /// JSON of the first entity, filled in before handlers are called.
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl Event {
    /// Fill [`Event::data`] from the first entity payload.
    pub fn derive_data(&mut self) -> Result<()> {
        self.data = match self.entities.first() {
            Some(entity) => serde_json::to_vec(entity)?,
            None => Vec::new(),
        };
        Ok(())
    }

    /// Decode the first entity into a resource type.
    ///
    /// Returns `Ok(None)` when the event carries no entity.
    pub fn entity<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.entities
            .first()
            .map(|entity| T::deserialize(entity).map_err(NuageError::MalformedPayload))
            .transpose()
    }
}
