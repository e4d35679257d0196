use derive_new::new;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// A tagged reference to the subject of a view: a type discriminator plus an opaque identifier.
///
/// The store never resolves the subject, it only stores and returns this pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewable {
    #[serde(rename = "viewable_type")]
    pub kind: String,
    #[serde(rename = "viewable_id")]
    pub id: String,
}

impl Viewable {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Viewable {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for Viewable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Parses the `type:id` form produced by [Viewable]'s `Display` implementation. The id may itself contain colons.
impl std::str::FromStr for Viewable {
    type Err = ParseViewable;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.split_once(':') {
            Some((kind, id)) if !kind.is_empty() && !id.is_empty() => Ok(Viewable::new(kind, id)),
            _ => Err(ParseViewable::new(input.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu, new)]
#[snafu(display("expected a viewable in the form `type:id`, got `{}`", text))]
pub struct ParseViewable {
    pub text: String,
}
