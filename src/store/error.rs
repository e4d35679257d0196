use snafu::{Location, Snafu};

use crate::database::DatabaseError;
use crate::model::ViewId;
use crate::Located;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum StoreError {
    /// A required field of a new view was missing or empty
    #[snafu(display("invalid view at {location}: `{field}` is required"))]
    Validation {
        field: &'static str,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("view `{id}` does not exist at {location}"))]
    NotFound {
        id: ViewId,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("`{table}` is not a valid table name at {location}"))]
    InvalidTable {
        table: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("storage failure at {location}: {source}"))]
    Storage {
        source: DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for StoreError {
    fn location(&self) -> Location {
        match self {
            StoreError::Validation { location, .. }
            | StoreError::NotFound { location, .. }
            | StoreError::InvalidTable { location, .. }
            | StoreError::Storage { location, .. } => *location,
        }
    }
}
