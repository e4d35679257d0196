use std::io::Write;

use clap::{Args, Parser, Subcommand};
use serde_json::json;
use snafu::{OptionExt as _, ResultExt as _, Snafu};

use crate::config::Config;
use crate::database::Database;
use crate::error::*;
use crate::logger;
use crate::model::{now, InvertedPeriod, NewView, Period, Timestamp, ViewId, Viewable};
use crate::store::{CollectionFilter, ViewFilter, ViewRecordStore};

#[derive(Debug, Parser)]
#[command(name = "viewable")]
#[command(about = "Record and query views of polymorphic subjects", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a view
    Record(RecordArgs),
    /// Print a single view
    Show { id: ViewId },
    /// Print every view matching the filters, oldest first
    List(FilterArgs),
    /// Count views matching the filters
    Count {
        #[command(flatten)]
        filter: FilterArgs,
        /// Count distinct visitors instead of views
        #[arg(long)]
        unique: bool,
    },
    /// Delete a view and print it
    Delete { id: ViewId },
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Subject of the view, as `type:id`
    pub viewable: Viewable,
    #[arg(long)]
    pub collection: Option<String>,
    #[arg(long)]
    pub visitor: Option<String>,
    /// When the view happened (RFC 3339), defaults to now
    #[arg(long)]
    pub at: Option<Timestamp>,
}

impl RecordArgs {
    fn into_view(self, now: Timestamp) -> NewView {
        NewView {
            viewable: self.viewable,
            collection: self.collection,
            visitor: self.visitor,
            viewed_at: Some(self.at.unwrap_or(now)),
        }
    }
}

#[derive(Debug, Default, Args)]
pub struct FilterArgs {
    /// Only views at or after this time (RFC 3339)
    #[arg(long, conflicts_with = "past")]
    pub from: Option<Timestamp>,
    /// Only views at or before this time (RFC 3339)
    #[arg(long)]
    pub until: Option<Timestamp>,
    /// Only views within this long before now, e.g. `7days` or `12h`
    #[arg(long, value_parser = humantime::parse_duration)]
    pub past: Option<std::time::Duration>,
    /// Only views since midnight N days ago
    #[arg(long, value_name = "N", conflicts_with_all = ["from", "past"])]
    pub past_days: Option<u32>,
    /// Only views since midnight N weeks ago
    #[arg(long, value_name = "N", conflicts_with_all = ["from", "past", "past_days"])]
    pub past_weeks: Option<u32>,
    /// Only views since midnight on the same day N months ago
    #[arg(
        long,
        value_name = "N",
        conflicts_with_all = ["from", "past", "past_days", "past_weeks"]
    )]
    pub past_months: Option<u32>,
    /// Only views since midnight on the same day N years ago
    #[arg(
        long,
        value_name = "N",
        conflicts_with_all = ["from", "past", "past_days", "past_weeks", "past_months"]
    )]
    pub past_years: Option<u32>,
    /// Only views in this collection
    #[arg(long, conflicts_with = "no_collection")]
    pub collection: Option<String>,
    /// Only views without a collection
    #[arg(long)]
    pub no_collection: bool,
    /// Only views of this subject, as `type:id`
    #[arg(long)]
    pub viewable: Option<Viewable>,
}

#[derive(Debug, Snafu)]
pub enum FilterError {
    #[snafu(display("invalid period: {source}"))]
    Inverted { source: InvertedPeriod },
    #[snafu(display("`--past` is too long: {source}"))]
    OutOfRange { source: chrono::OutOfRangeError },
}

impl FilterArgs {
    /// The period selected by one of the `--past*` flags, if any.
    fn relative_period(&self, now: Timestamp) -> Result<Option<Period>, FilterError> {
        let period = if let Some(past) = self.past {
            let past = chrono::Duration::from_std(past).context(OutOfRangeSnafu)?;
            Period::sub(past, now)
        } else if let Some(days) = self.past_days {
            Period::past_days(days, now)
        } else if let Some(weeks) = self.past_weeks {
            Period::past_weeks(weeks, now)
        } else if let Some(months) = self.past_months {
            Period::past_months(months, now)
        } else if let Some(years) = self.past_years {
            Period::past_years(years, now)
        } else {
            return Ok(None);
        };

        Ok(Some(period))
    }

    pub fn to_filter(&self, now: Timestamp) -> Result<ViewFilter, FilterError> {
        let start = match self.relative_period(now)? {
            Some(relative) => relative.start(),
            None => self.from,
        };
        let period = Period::from_bounds(start, self.until).context(InvertedSnafu)?;

        let collection = match (&self.collection, self.no_collection) {
            (Some(name), _) => CollectionFilter::Named(name.clone()),
            (None, true) => CollectionFilter::Unset,
            (None, false) => CollectionFilter::Any,
        };

        Ok(ViewFilter {
            period,
            collection,
            viewable: self.viewable.clone(),
        })
    }
}

/// Loads the configuration, sets up logging and runs `cli` against the configured store.
pub async fn run(cli: Cli) -> Result<(), ApplicationError> {
    let config = Config::from_env()?;
    let _guard = logger::init(&config)?;

    let database = Database::connect(&config.database)
        .await
        .context(ConnectDatabaseSnafu)?;
    let store = ViewRecordStore::new(database, &config.store).context(StoreSnafu)?;

    let result = execute(cli.command, &store, &mut std::io::stdout()).await;
    if let Err(err) = &result {
        tracing::error!(location = %crate::Located::location(err), "{err}");
    }
    result
}

/// Runs a single command, writing its results to `out` as JSON lines.
pub async fn execute(
    command: Command, store: &ViewRecordStore, out: &mut impl Write,
) -> Result<(), ApplicationError> {
    match command {
        Command::Record(args) => {
            let id = store
                .create(args.into_view(now()))
                .await
                .context(StoreSnafu)?;
            emit(out, &json!({ "id": id }))
        }
        Command::Show { id } => {
            let record = store.find(&id).await.context(StoreSnafu)?;
            let record = record.context(UnknownViewSnafu { id })?;
            emit(out, &record)
        }
        Command::List(args) => {
            let filter = args.to_filter(now()).context(InvalidFilterSnafu)?;
            for record in store.query(&filter).await.context(StoreSnafu)? {
                emit(out, &record)?;
            }
            Ok(())
        }
        Command::Count { filter, unique } => {
            let filter = filter.to_filter(now()).context(InvalidFilterSnafu)?;
            if unique {
                let visitors = store.count_unique(&filter).await.context(StoreSnafu)?;
                emit(out, &json!({ "unique_visitors": visitors }))
            } else {
                let views = store.count(&filter).await.context(StoreSnafu)?;
                emit(out, &json!({ "views": views }))
            }
        }
        Command::Delete { id } => {
            let record = store.delete(&id).await.context(StoreSnafu)?;
            emit(out, &record)
        }
    }
}

fn emit(out: &mut impl Write, value: &impl serde::Serialize) -> Result<(), ApplicationError> {
    let line = serde_json::to_string(value).context(SerializeOutputSnafu)?;
    writeln!(out, "{line}").context(WriteOutputSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseConfig;
    use crate::model::ViewRecord;
    use crate::store::StoreConfig;
    use chrono::{TimeZone, Utc};

    fn at(month: u32, day: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, month, day, 12, 0, 0).unwrap().into()
    }

    async fn store() -> ViewRecordStore {
        let database = Database::connect(&DatabaseConfig::memory()).await.unwrap();
        ViewRecordStore::new(database, &StoreConfig::default()).unwrap()
    }

    async fn run_line(store: &ViewRecordStore, args: &[&str]) -> Vec<serde_json::Value> {
        let cli = Cli::try_parse_from(std::iter::once("viewable").chain(args.iter().copied()))
            .unwrap();
        let mut out = Vec::new();
        execute(cli.command, store, &mut out).await.unwrap();

        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn filter_args_translate_to_filter() {
        let args = FilterArgs {
            from: Some(at(1, 10)),
            until: Some(at(1, 31)),
            no_collection: true,
            viewable: Some(Viewable::new("post", "1")),
            ..FilterArgs::default()
        };

        let filter = args.to_filter(at(3, 1)).unwrap();
        assert_eq!(filter.period, Period::between(at(1, 10), at(1, 31)).unwrap());
        assert_eq!(filter.collection, CollectionFilter::Unset);
        assert_eq!(filter.viewable, Some(Viewable::new("post", "1")));
    }

    #[test]
    fn past_is_relative_to_now() {
        let args = FilterArgs {
            past: Some(std::time::Duration::from_secs(2 * 24 * 60 * 60)),
            ..FilterArgs::default()
        };

        let filter = args.to_filter(at(1, 15)).unwrap();
        assert_eq!(filter.period, Period::since(at(1, 13)));
    }

    fn list_filter(flags: &[&str], now: Timestamp) -> ViewFilter {
        let cli = Cli::try_parse_from(["viewable", "list"].into_iter().chain(flags.iter().copied()))
            .unwrap();
        let Command::List(args) = cli.command else {
            panic!("expected the list command");
        };
        args.to_filter(now).unwrap()
    }

    fn midnight(year: i32, month: u32, day: u32) -> Timestamp {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap().into()
    }

    #[test]
    fn calendar_flags_start_at_midnight() {
        let now: Timestamp = Utc.with_ymd_and_hms(2024, 3, 31, 17, 45, 0).unwrap().into();

        let days = list_filter(&["--past-days", "3"], now);
        assert_eq!(days.period, Period::since(midnight(2024, 3, 28)));

        let weeks = list_filter(&["--past-weeks", "1"], now);
        assert_eq!(weeks.period, Period::since(midnight(2024, 3, 24)));

        let months = list_filter(&["--past-months", "1"], now);
        assert_eq!(months.period, Period::since(midnight(2024, 2, 29)));

        let years = list_filter(&["--past-years", "1"], now);
        assert_eq!(years.period, Period::since(midnight(2023, 3, 31)));

        let capped = list_filter(&["--past-days", "3", "--until", "2024-03-30T00:00:00Z"], now);
        assert_eq!(
            capped.period,
            Period::between(midnight(2024, 3, 28), midnight(2024, 3, 30)).unwrap()
        );
    }

    #[test]
    fn only_one_start_flag_is_accepted() {
        for flags in [
            ["--from", "2024-01-01T00:00:00Z", "--past-days", "3"],
            ["--past", "2days", "--past-weeks", "1"],
            ["--past-months", "1", "--past-years", "1"],
        ] {
            let result =
                Cli::try_parse_from(["viewable", "count"].into_iter().chain(flags));
            assert!(result.is_err(), "{flags:?} should conflict");
        }
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let args = FilterArgs {
            from: Some(at(2, 1)),
            until: Some(at(1, 1)),
            ..FilterArgs::default()
        };

        assert!(matches!(
            args.to_filter(at(3, 1)),
            Err(FilterError::Inverted { .. })
        ));
    }

    #[test]
    fn collection_flags_conflict() {
        let result =
            Cli::try_parse_from(["viewable", "list", "--collection", "guests", "--no-collection"]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn record_list_count_and_delete() {
        let store = store().await;

        let created = run_line(
            &store,
            &[
                "record",
                "post:42",
                "--collection",
                "guests",
                "--visitor",
                "203.0.113.7",
                "--at",
                "2024-01-15T12:00:00Z",
            ],
        )
        .await;
        let id = created[0]["id"].as_str().unwrap().to_string();

        run_line(&store, &["record", "post:42", "--at", "2024-02-01T12:00:00Z"]).await;

        let listed = run_line(&store, &["list", "--collection", "guests"]).await;
        assert_eq!(listed.len(), 1);
        let record: ViewRecord = serde_json::from_value(listed[0].clone()).unwrap();
        assert_eq!(record.id.as_str(), id);
        assert_eq!(record.viewable, Viewable::new("post", "42"));
        assert_eq!(record.viewed_at, at(1, 15));

        let counted = run_line(&store, &["count", "--viewable", "post:42"]).await;
        assert_eq!(counted[0]["views"], 2);

        let unique = run_line(&store, &["count", "--unique"]).await;
        assert_eq!(unique[0]["unique_visitors"], 1);

        let ranged = run_line(
            &store,
            &["count", "--from", "2024-01-20T00:00:00Z", "--until", "2024-02-10T00:00:00Z"],
        )
        .await;
        assert_eq!(ranged[0]["views"], 1);

        let recent = run_line(&store, &["count", "--past-days", "7"]).await;
        assert_eq!(recent[0]["views"], 0);

        let deleted = run_line(&store, &["delete", id.as_str()]).await;
        assert_eq!(deleted[0]["id"], id.as_str());

        let cli = Cli::try_parse_from(["viewable", "show", id.as_str()]).unwrap();
        let err = execute(cli.command, &store, &mut Vec::new()).await.unwrap_err();
        assert!(matches!(err, ApplicationError::UnknownView { .. }));
    }
}
