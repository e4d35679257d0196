pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod logger;
pub mod model;
pub mod store;

pub use error::ApplicationError;
pub use model::{NewView, Period, Timestamp, ViewId, ViewRecord, Viewable};
pub use store::{CollectionFilter, StoreConfig, StoreError, ViewFilter, ViewRecordStore};

pub trait Located {
    fn location(&self) -> snafu::Location;
}
