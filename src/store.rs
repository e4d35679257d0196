use serde::{Deserialize, Serialize};
use snafu::{ensure, OptionExt as _, ResultExt as _};
use tracing::instrument;

use crate::database::{Database, DatabaseQuerySnafu, EmptyQuerySnafu, Thing};
use crate::model::*;

pub use error::*;
pub use filter::*;

mod error;
mod filter;

pub const DEFAULT_TABLE: &str = "views";

/// Settings consumed by [ViewRecordStore], resolved once at startup.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    #[serde(rename = "views_table", default = "default_table")]
    pub table: String,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            table: default_table(),
        }
    }
}

fn is_valid_table(table: &str) -> bool {
    let mut chars = table.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The stored shape of a view. `id` comes back as a full record id (`views:⟨…⟩`).
#[derive(Debug, Deserialize)]
struct ViewRow {
    id: Thing,
    #[serde(flatten)]
    viewable: Viewable,
    #[serde(default)]
    collection: Option<String>,
    #[serde(default)]
    visitor: Option<String>,
    viewed_at: Timestamp,
}

impl From<ViewRow> for ViewRecord {
    fn from(row: ViewRow) -> Self {
        ViewRecord {
            id: ViewId::from(row.id.id.to_raw()),
            viewable: row.viewable,
            collection: row.collection,
            visitor: row.visitor,
            viewed_at: row.viewed_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct ViewContent<'a> {
    viewable_type: &'a str,
    viewable_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    collection: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    visitor: Option<&'a str>,
    viewed_at: Timestamp,
}

#[derive(Debug, Deserialize)]
struct Total {
    total: u64,
}

/// Persists [ViewRecord]s and answers filtered queries over them.
///
/// Records are immutable: they can only be created and deleted.
#[derive(Debug, Clone)]
pub struct ViewRecordStore {
    database: Database,
    table: String,
}

impl ViewRecordStore {
    pub fn new(database: Database, config: &StoreConfig) -> Result<Self> {
        ensure!(
            is_valid_table(&config.table),
            InvalidTableSnafu {
                table: config.table.clone()
            }
        );

        Ok(ViewRecordStore {
            database,
            table: config.table.clone(),
        })
    }

    /// Stores a new view and returns the id assigned to it.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn create(&self, view: NewView) -> Result<ViewId> {
        ensure!(
            !view.viewable.kind.is_empty(),
            ValidationSnafu {
                field: "viewable_type"
            }
        );
        ensure!(
            !view.viewable.id.is_empty(),
            ValidationSnafu {
                field: "viewable_id"
            }
        );
        let viewed_at = view.viewed_at.context(ValidationSnafu { field: "viewed_at" })?;

        let id = ViewId::random();
        let content = ViewContent {
            viewable_type: &view.viewable.kind,
            viewable_id: &view.viewable.id,
            collection: view.collection.as_deref(),
            visitor: view.visitor.as_deref(),
            viewed_at,
        };

        let created: Option<ViewRow> = self
            .database
            .create((self.table.as_str(), id.as_str()))
            .content(content)
            .await
            .context(DatabaseQuerySnafu)
            .context(StorageSnafu)?;
        created.context(EmptyQuerySnafu).context(StorageSnafu)?;

        tracing::info!(view_id = %id, viewable = %view.viewable, "recorded view");
        Ok(id)
    }

    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn find(&self, id: &ViewId) -> Result<Option<ViewRecord>> {
        let row: Option<ViewRow> = self
            .database
            .select((self.table.as_str(), id.as_str()))
            .await
            .context(DatabaseQuerySnafu)
            .context(StorageSnafu)?;

        Ok(row.map(ViewRecord::from))
    }

    /// Views matching every part of `filter`, ordered by `viewed_at`.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn query(&self, filter: &ViewFilter) -> Result<Vec<ViewRecord>> {
        let sql = format!(
            "SELECT * FROM type::table($table){} ORDER BY viewed_at ASC, id ASC",
            filter.where_clause()
        );
        tracing::debug!(%sql, "querying views");

        let query = self.database.sql(sql).bind(("table", self.table.clone()));
        let rows: Vec<ViewRow> = filter.bind(query).fetch().await.context(StorageSnafu)?;

        Ok(rows.into_iter().map(ViewRecord::from).collect())
    }

    /// Views whose `viewed_at` falls within `period`.
    pub async fn query_by_period(&self, period: Period) -> Result<Vec<ViewRecord>> {
        self.query(&ViewFilter::all().within(period)).await
    }

    /// Views tagged with exactly `collection`. `None` selects views without a collection.
    pub async fn query_by_collection(&self, collection: Option<&str>) -> Result<Vec<ViewRecord>> {
        self.query(&ViewFilter::all().in_collection(collection))
            .await
    }

    /// Every view of `viewable`.
    pub async fn views_of(&self, viewable: &Viewable) -> Result<Vec<ViewRecord>> {
        self.query(&ViewFilter::all().of(viewable.clone())).await
    }

    /// Number of views matching `filter`.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn count(&self, filter: &ViewFilter) -> Result<u64> {
        let sql = format!(
            "SELECT count() AS total FROM type::table($table){} GROUP ALL",
            filter.where_clause()
        );

        let query = self.database.sql(sql).bind(("table", self.table.clone()));
        let total: Option<Total> = filter.bind(query).fetch().await.context(StorageSnafu)?;

        Ok(total.map_or(0, |total| total.total))
    }

    /// Number of distinct visitors among the views matching `filter`. Views without a visitor are not counted.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn count_unique(&self, filter: &ViewFilter) -> Result<u64> {
        let sql = format!(
            "SELECT count() AS total FROM (SELECT visitor FROM type::table($table){} GROUP BY visitor) GROUP ALL",
            filter.where_clause_with(&["visitor != NONE", "visitor != NULL"])
        );

        let query = self.database.sql(sql).bind(("table", self.table.clone()));
        let total: Option<Total> = filter.bind(query).fetch().await.context(StorageSnafu)?;

        Ok(total.map_or(0, |total| total.total))
    }

    /// Removes a view, returning it as it was stored.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn delete(&self, id: &ViewId) -> Result<ViewRecord> {
        let row: Option<ViewRow> = self
            .database
            .delete((self.table.as_str(), id.as_str()))
            .await
            .context(DatabaseQuerySnafu)
            .context(StorageSnafu)?;

        let record = ViewRecord::from(row.context(NotFoundSnafu { id: id.clone() })?);

        tracing::info!(view_id = %id, "deleted view");
        Ok(record)
    }
}
