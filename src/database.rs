use derive_new::new;
use serde::Deserialize;
use snafu::{Location, ResultExt as _, Snafu};
use surrealdb::{
    engine::any::Any,
    opt::{auth, IntoQuery, QueryResult},
    Surreal,
};
use url::Url;

pub use surrealdb::sql::Thing;

use crate::Located;

pub type Result<T, E = DatabaseError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DatabaseError {
    #[snafu(display("failed to query the database at {location}: {source}"))]
    DatabaseQuery {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to deserialize the database response at {location}: {source}"))]
    DatabaseDeserialize {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to parse the database response at {location}: response is empty"))]
    EmptyQuery {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("cannot connect to the database `{url}` at {location}: {source}"))]
    DatabaseConnection {
        url: Url,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display(
        "cannot select namespace `{namespace}` and database `{database}` at {location}: {source}"
    ))]
    SelectDatabase {
        namespace: String,
        database: String,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for DatabaseError {
    fn location(&self) -> Location {
        match self {
            DatabaseError::DatabaseQuery { location, .. }
            | DatabaseError::DatabaseDeserialize { location, .. }
            | DatabaseError::EmptyQuery { location, .. }
            | DatabaseError::DatabaseConnection { location, .. }
            | DatabaseError::SelectDatabase { location, .. } => *location,
        }
    }
}

/// Connection settings for the backing SurrealDB instance.
///
/// Any endpoint understood by [surrealdb::engine::any] works here, `mem://` selects the embedded in-memory engine.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    #[serde(rename = "surreal_url")]
    pub url: Url,
    #[serde(rename = "surreal_ns", default = "default_namespace")]
    pub namespace: String,
    #[serde(rename = "surreal_db", default = "default_database")]
    pub database: String,
    #[serde(rename = "surreal_user", default)]
    pub username: Option<String>,
    #[serde(rename = "surreal_pass", default)]
    pub password: Option<String>,
}

fn default_namespace() -> String {
    "viewable".to_string()
}

fn default_database() -> String {
    "viewable".to_string()
}

impl DatabaseConfig {
    /// Settings for a fresh embedded in-memory database.
    pub fn memory() -> Self {
        DatabaseConfig {
            url: Url::parse("mem://").expect("`mem://` is a valid url"),
            namespace: default_namespace(),
            database: default_database(),
            username: None,
            password: None,
        }
    }

    fn credentials(&self) -> Option<Auth> {
        let username = self.username.as_ref()?;
        let password = self.password.as_ref()?;

        Some(Auth::new(
            username.clone(),
            password.clone(),
            self.namespace.clone(),
            self.database.clone(),
        ))
    }
}

/// Represents authentication information for a database connection.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Auth {
    pub username: String,
    pub password: String,
    pub namespace: String,
    pub database: String,
}

impl Auth {
    pub fn to_raw(&self) -> impl auth::Credentials<auth::Signin, auth::Jwt> + '_ {
        auth::Database {
            username: &self.username,
            password: &self.password,
            namespace: &self.namespace,
            database: &self.database,
        }
    }
}

/// Represents a database wrapper.
///
/// Cloning is cheap, every clone shares the same underlying connection.
#[derive(Debug, Clone, new)]
pub struct Database {
    database: Surreal<Any>,
}

impl Database {
    /// Connects to the database, signs in when credentials are configured and selects the namespace and database.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let db = surrealdb::engine::any::connect(config.url.as_str())
            .await
            .context(DatabaseConnectionSnafu {
                url: config.url.clone(),
            })?;

        if let Some(auth) = config.credentials() {
            db.signin(auth.to_raw())
                .await
                .context(DatabaseConnectionSnafu {
                    url: config.url.clone(),
                })?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .context(SelectDatabaseSnafu {
                namespace: config.namespace.clone(),
                database: config.database.clone(),
            })?;

        tracing::info!(url = %config.url, namespace = %config.namespace, database = %config.database, "connected to database");

        Ok(Database::new(db))
    }

    /// Create a builder to execute arbitrary SQL code on the database.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let views: Vec<ViewRow> = db.sql("SELECT * FROM type::table($table) WHERE visitor = $visitor")
    ///                 .bind(("table", "views"))
    ///                 .bind(("visitor", "203.0.113.7"))
    ///                 .fetch().await?;
    /// ```
    ///
    /// The `fetch` method can deserialize the result into either a single value (`Option<T>`) or a collection of values (`Vec<T>`).
    pub fn sql(&self, query: impl IntoQuery) -> Query<'_> {
        let query = self.database.query(query);
        Query { query }
    }
}

impl std::ops::Deref for Database {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.database
    }
}

#[derive(Debug)]
pub struct Query<'a> {
    query: surrealdb::method::Query<'a, Any>,
}

impl Query<'_> {
    pub fn bind(mut self, params: impl serde::Serialize) -> Self {
        let query = self.query;
        self.query = query.bind(params);
        self
    }

    pub async fn fetch<T: serde::de::DeserializeOwned>(self) -> Result<T>
    where
        usize: QueryResult<T>,
    {
        let mut statements = self
            .query
            .await
            .context(DatabaseQuerySnafu)?
            .check()
            .context(DatabaseQuerySnafu)?;
        let result = statements.take::<T>(0).context(DatabaseDeserializeSnafu)?;
        Ok(result)
    }
}
