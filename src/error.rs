use snafu::{Location, Snafu};

use crate::database::DatabaseError;
use crate::model::ViewId;
use crate::store::StoreError;
use crate::Located;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApplicationError {
    /// could not parse the configuration from the environment
    #[snafu(display("could not load the configuration at {location}: {source}"))]
    ConfigLoad {
        source: envy::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not connect to the database
    #[snafu(display("could not connect to the database at {location}: {source}"))]
    ConnectDatabase {
        source: DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not open the view store
    #[snafu(display("{source}"))]
    Store {
        source: StoreError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not initialize the logger
    #[snafu(display("could not initialize the logger at {location}: {source}"))]
    InitializeLogger {
        source: tracing::subscriber::SetGlobalDefaultError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("invalid filter: {source}"))]
    InvalidFilter {
        source: crate::cli::FilterError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("view `{id}` does not exist"))]
    UnknownView {
        id: ViewId,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not serialize output at {location}: {source}"))]
    SerializeOutput {
        source: serde_json::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not write the command output
    #[snafu(display("could not write output at {location}: {source}"))]
    WriteOutput {
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for ApplicationError {
    fn location(&self) -> Location {
        match self {
            ApplicationError::Store { source, .. } => source.location(),
            ApplicationError::ConnectDatabase { source, .. } => source.location(),
            ApplicationError::ConfigLoad { location, .. }
            | ApplicationError::InitializeLogger { location, .. }
            | ApplicationError::InvalidFilter { location, .. }
            | ApplicationError::UnknownView { location, .. }
            | ApplicationError::SerializeOutput { location, .. }
            | ApplicationError::WriteOutput { location, .. } => *location,
        }
    }
}
