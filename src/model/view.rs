use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::*;

/// Identifier of a stored view record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(String);

impl ViewId {
    pub fn random() -> Self {
        ViewId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ViewId {
    fn from(value: String) -> Self {
        ViewId(value)
    }
}

impl From<&str> for ViewId {
    fn from(value: &str) -> Self {
        ViewId(value.to_string())
    }
}

impl std::str::FromStr for ViewId {
    type Err = std::convert::Infallible;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Ok(ViewId::from(input))
    }
}

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ViewId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One observed view of a [Viewable].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRecord {
    pub id: ViewId,
    #[serde(flatten)]
    pub viewable: Viewable,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub visitor: Option<String>,
    pub viewed_at: Timestamp,
}

/// The input of [crate::store::ViewRecordStore::create].
///
/// `viewed_at` is optional here so that payloads coming from outside the type system (JSON, CLI) can be validated by the store rather than rejected by serde.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewView {
    #[serde(flatten)]
    pub viewable: Viewable,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub visitor: Option<String>,
    #[serde(default)]
    pub viewed_at: Option<Timestamp>,
}

impl NewView {
    pub fn new(viewable: Viewable, viewed_at: Timestamp) -> Self {
        NewView {
            viewable,
            collection: None,
            visitor: None,
            viewed_at: Some(viewed_at),
        }
    }

    pub fn in_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn by_visitor(mut self, visitor: impl Into<String>) -> Self {
        self.visitor = Some(visitor.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_unique() {
        assert_ne!(ViewId::random(), ViewId::random());
    }

    #[test]
    fn new_view_without_viewed_at_deserializes() {
        let view: NewView = serde_json::from_value(serde_json::json!({
            "viewable_type": "post",
            "viewable_id": "42",
            "collection": "guests",
        }))
        .unwrap();

        assert_eq!(view.viewable, Viewable::new("post", "42"));
        assert_eq!(view.collection.as_deref(), Some("guests"));
        assert_eq!(view.visitor, None);
        assert_eq!(view.viewed_at, None);
    }
}
