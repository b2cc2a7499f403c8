//! Resource identities.

use std::fmt;

/// The type tag of a resource: its REST name and its collection name.
///
/// The REST name is usually the singular form of the resource name, for
/// instance `enterprise` and `enterprises`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Identity {
    /// Singular name, as found in event `entityType` fields.
    pub rest_name: &'static str,
    /// Collection name, used to build URLs.
    pub resource_name: &'static str,
}

impl Identity {
    /// Reserved identity standing for every resource type.
    ///
    /// Only meaningful for push center handler registration.
    pub const ALL: Identity = Identity::new("__all__", "__all__");

    pub const fn new(rest_name: &'static str, resource_name: &'static str) -> Self {
        Self {
            rest_name,
            resource_name,
        }
    }

    /// Returns true for [`Identity::ALL`].
    pub fn is_all(&self) -> bool {
        self.rest_name == Self::ALL.rest_name
    }

    /// Returns true when no resource name is set.
    pub fn is_empty(&self) -> bool {
        self.resource_name.is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}|{}>", self.rest_name, self.resource_name)
    }
}
