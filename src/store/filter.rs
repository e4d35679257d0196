use serde::{Deserialize, Serialize};

use crate::database::Query;
use crate::model::{Period, ViewRecord, Viewable};

/// How a query narrows on the `collection` field.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionFilter {
    /// No narrowing, views of every collection match.
    #[default]
    Any,
    /// Views tagged with exactly this collection.
    Named(String),
    /// Views without a collection.
    Unset,
}

impl CollectionFilter {
    /// Exact-match filter: `None` selects views whose collection is unset, not views of any collection.
    pub fn exact(collection: Option<&str>) -> Self {
        match collection {
            Some(name) => CollectionFilter::Named(name.to_string()),
            None => CollectionFilter::Unset,
        }
    }

    pub fn matches(&self, collection: Option<&str>) -> bool {
        match self {
            CollectionFilter::Any => true,
            CollectionFilter::Named(name) => collection == Some(name.as_str()),
            CollectionFilter::Unset => collection.is_none(),
        }
    }
}

/// Parameters narrowing a view query. Every set part must hold for a view to match.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFilter {
    #[serde(default)]
    pub period: Period,
    #[serde(default)]
    pub collection: CollectionFilter,
    #[serde(default)]
    pub viewable: Option<Viewable>,
}

impl ViewFilter {
    /// A filter matching every view.
    pub fn all() -> Self {
        ViewFilter::default()
    }

    pub fn within(self, period: Period) -> Self {
        ViewFilter { period, ..self }
    }

    /// Narrow to an exact collection, see [CollectionFilter::exact].
    pub fn in_collection(self, collection: Option<&str>) -> Self {
        ViewFilter {
            collection: CollectionFilter::exact(collection),
            ..self
        }
    }

    pub fn of(self, viewable: Viewable) -> Self {
        ViewFilter {
            viewable: Some(viewable),
            ..self
        }
    }

    pub fn matches(&self, record: &ViewRecord) -> bool {
        self.period.contains(record.viewed_at)
            && self.collection.matches(record.collection.as_deref())
            && self
                .viewable
                .as_ref()
                .map_or(true, |viewable| viewable == &record.viewable)
    }

    /// SurrealQL conditions for this filter, in a stable order.
    ///
    /// A missing field reads as `NONE` while an explicit null reads as `NULL`, and the two are not equal, so an unset collection checks both.
    fn conditions(&self) -> Vec<&'static str> {
        let mut conditions = Vec::new();

        match (self.period.start(), self.period.end()) {
            (Some(_), Some(_)) => conditions.push("viewed_at >= $start AND viewed_at <= $end"),
            (Some(_), None) => conditions.push("viewed_at >= $start"),
            (None, Some(_)) => conditions.push("viewed_at <= $end"),
            (None, None) => {}
        }

        match self.collection {
            CollectionFilter::Any => {}
            CollectionFilter::Named(_) => conditions.push("collection = $collection"),
            CollectionFilter::Unset => {
                conditions.push("(collection = NONE OR collection = NULL)")
            }
        }

        if self.viewable.is_some() {
            conditions.push("viewable_type = $viewable_type AND viewable_id = $viewable_id");
        }

        conditions
    }

    /// The `WHERE` clause for this filter, including its leading space, or an empty string when nothing narrows.
    pub(super) fn where_clause(&self) -> String {
        self.where_clause_with(&[])
    }

    /// Like [ViewFilter::where_clause], with `extra` conditions appended after the filter's own.
    pub(super) fn where_clause_with(&self, extra: &[&'static str]) -> String {
        let mut conditions = self.conditions();
        conditions.extend_from_slice(extra);
        if conditions.is_empty() {
            return String::new();
        }

        format!(" WHERE {}", conditions.join(" AND "))
    }

    /// Binds every parameter referenced by [ViewFilter::where_clause].
    pub(super) fn bind<'a>(&self, mut query: Query<'a>) -> Query<'a> {
        if let Some(start) = self.period.start() {
            query = query.bind(("start", start));
        }

        if let Some(end) = self.period.end() {
            query = query.bind(("end", end));
        }

        if let CollectionFilter::Named(name) = &self.collection {
            query = query.bind(("collection", name.clone()));
        }

        if let Some(viewable) = &self.viewable {
            query = query
                .bind(("viewable_type", viewable.kind.clone()))
                .bind(("viewable_id", viewable.id.clone()));
        }

        query
    }
}
