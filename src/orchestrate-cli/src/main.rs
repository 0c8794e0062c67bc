use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use orchestrate_rs::{
    BareResponse, Client, ClientConfig, CollectionResponse, Condition, EventRange, ItemResponse,
    RangeOptions, RefListOptions, SearchOptions, Timestamp,
};
use serde_json::{json, Value};

mod telemetry;

#[derive(Parser, Debug)]
#[command(name = "orchestrate", version, about = "Command line client for the Orchestrate API")]
struct Cli {
    /// JSON config file; falls back to ORCHESTRATE_API_KEY / ORCHESTRATE_BASE_URL
    #[arg(long, global = true)]
    config: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the endpoint and API key
    Ping,
    /// Fetch a value
    Get {
        collection: String,
        key: String,
        #[arg(long = "ref")]
        ref_: Option<String>,
    },
    /// Store a JSON value
    Put {
        collection: String,
        key: String,
        value: String,
        /// Only store if the current ref matches
        #[arg(long, conflicts_with = "if_absent")]
        if_match: Option<String>,
        /// Only store if the key has no value
        #[arg(long)]
        if_absent: bool,
    },
    /// Delete a value
    Delete {
        collection: String,
        key: String,
        #[arg(long = "ref")]
        ref_: Option<String>,
        /// Also remove all history
        #[arg(long)]
        purge: bool,
    },
    /// List keys in a collection
    List {
        collection: String,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Run a search query
    Search {
        collection: String,
        query: String,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
        #[arg(long)]
        sort: Option<String>,
    },
    /// List the refs of a key
    Refs {
        collection: String,
        key: String,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
        #[arg(long)]
        values: bool,
    },
    /// List events of one type
    Events {
        collection: String,
        key: String,
        event_type: String,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Append an event
    PostEvent {
        collection: String,
        key: String,
        event_type: String,
        value: String,
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Follow relations from a key
    Relations {
        collection: String,
        key: String,
        #[arg(required = true)]
        kinds: Vec<String>,
    },
    /// Create a relation
    Relate {
        collection: String,
        key: String,
        kind: String,
        to_collection: String,
        to_key: String,
    },
    /// Remove a relation
    Unrelate {
        collection: String,
        key: String,
        kind: String,
        to_collection: String,
        to_key: String,
    },
}

#[derive(Args, Debug)]
struct RangeArgs {
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long)]
    start: Option<String>,
    #[arg(long)]
    after: Option<String>,
    #[arg(long)]
    before: Option<String>,
    #[arg(long)]
    end: Option<String>,
}

impl RangeArgs {
    fn into_key_range(self) -> RangeOptions {
        RangeOptions {
            limit: self.limit,
            start: self.start,
            after: self.after,
            before: self.before,
            end: self.end,
        }
    }

    fn into_event_range(self) -> EventRange {
        EventRange {
            limit: self.limit,
            start: self.start.as_deref().map(parse_timestamp),
            after: self.after.as_deref().map(parse_timestamp),
            before: self.before.as_deref().map(parse_timestamp),
            end: self.end.as_deref().map(parse_timestamp),
        }
    }
}

/// Integer milliseconds, RFC 3339 instant, `YYYY-MM-DD` date, or raw text
fn parse_timestamp(input: &str) -> Timestamp {
    if let Ok(millis) = input.parse::<i64>() {
        return Timestamp::Millis(millis);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Timestamp::Instant(at.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Timestamp::Date(date);
    }
    Timestamp::Raw(input.to_string())
}

fn parse_json(input: &str) -> Result<Value> {
    serde_json::from_str(input).context("Value must be valid JSON")
}

fn load_config(path: Option<&str>) -> Result<ClientConfig> {
    match path {
        Some(path) => ClientConfig::load(path),
        None => ClientConfig::from_env(),
    }
}

fn item_json(item: &ItemResponse) -> Value {
    json!({
        "collection": item.collection,
        "key": item.key,
        "ref": item.ref_,
        "timestamp": item.timestamp,
        "ordinal": item.ordinal,
        "tombstone": item.tombstone,
        "value": item.value,
    })
}

fn collection_json(page: &CollectionResponse) -> Value {
    json!({
        "count": page.count,
        "total_count": page.total_count,
        "results": page.results.iter().map(item_json).collect::<Vec<_>>(),
        "next": page.next,
    })
}

fn bare_json(bare: &BareResponse) -> Value {
    json!({
        "status": bare.status,
        "location": bare.location,
    })
}

async fn run(client: &Client, command: Command) -> Result<Value> {
    let output = match command {
        Command::Ping => bare_json(&client.ping().await?),
        Command::Get {
            collection,
            key,
            ref_,
        } => item_json(&client.get(&collection, &key, ref_.as_deref()).await?),
        Command::Put {
            collection,
            key,
            value,
            if_match,
            if_absent,
        } => {
            let value = parse_json(&value)?;
            let condition = match (if_match, if_absent) {
                (Some(ref_), _) => Condition::MatchRef(ref_),
                (None, true) => Condition::RequireAbsent,
                (None, false) => Condition::None,
            };
            item_json(&client.put(&collection, &key, &value, condition).await?)
        }
        Command::Delete {
            collection,
            key,
            ref_,
            purge,
        } => {
            let response = if purge {
                client.purge(&collection, &key, ref_.as_deref()).await?
            } else {
                client.delete(&collection, &key, ref_.as_deref()).await?
            };
            bare_json(&response)
        }
        Command::List { collection, range } => {
            collection_json(&client.list(&collection, range.into_key_range()).await?)
        }
        Command::Search {
            collection,
            query,
            limit,
            offset,
            sort,
        } => {
            let options = SearchOptions {
                limit,
                offset,
                sort,
            };
            collection_json(&client.search(&collection, &query, options).await?)
        }
        Command::Refs {
            collection,
            key,
            limit,
            offset,
            values,
        } => {
            let options = RefListOptions {
                limit,
                offset,
                values,
            };
            collection_json(&client.list_refs(&collection, &key, options).await?)
        }
        Command::Events {
            collection,
            key,
            event_type,
            range,
        } => collection_json(
            &client
                .list_events(&collection, &key, &event_type, range.into_event_range())
                .await?,
        ),
        Command::PostEvent {
            collection,
            key,
            event_type,
            value,
            timestamp,
        } => {
            let value = parse_json(&value)?;
            let timestamp = timestamp.as_deref().map(parse_timestamp);
            item_json(
                &client
                    .post_event(&collection, &key, &event_type, &value, timestamp)
                    .await?,
            )
        }
        Command::Relations {
            collection,
            key,
            kinds,
        } => {
            let kinds: Vec<&str> = kinds.iter().map(String::as_str).collect();
            collection_json(&client.get_relations(&collection, &key, &kinds).await?)
        }
        Command::Relate {
            collection,
            key,
            kind,
            to_collection,
            to_key,
        } => bare_json(
            &client
                .put_relation(&collection, &key, &kind, &to_collection, &to_key)
                .await?,
        ),
        Command::Unrelate {
            collection,
            key,
            kind,
            to_collection,
            to_key,
        } => bare_json(
            &client
                .delete_relation(&collection, &key, &kind, &to_collection, &to_key)
                .await?,
        ),
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_telemetry(cli.log_json)?;

    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(endpoint = %config.endpoint(), "Configuration loaded");

    let client = Client::new(config)?;
    let output = run(&client, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_forms() {
        assert_eq!(parse_timestamp("1000"), Timestamp::Millis(1000));
        assert_eq!(
            parse_timestamp("2014-04-01"),
            Timestamp::Date(NaiveDate::from_ymd_opt(2014, 4, 1).unwrap())
        );
        assert!(matches!(
            parse_timestamp("2014-04-01T10:00:00Z"),
            Timestamp::Instant(_)
        ));
        assert_eq!(
            parse_timestamp("1398286518286/6"),
            Timestamp::Raw("1398286518286/6".to_string())
        );
    }

    #[test]
    fn test_cli_parses_put_condition() {
        let cli = Cli::try_parse_from([
            "orchestrate",
            "put",
            "users",
            "u1",
            r#"{"name":"Ada"}"#,
            "--if-match",
            "abc",
        ])
        .unwrap();
        match cli.command {
            Command::Put { if_match, if_absent, .. } => {
                assert_eq!(if_match.as_deref(), Some("abc"));
                assert!(!if_absent);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let conflicting = Cli::try_parse_from([
            "orchestrate", "put", "users", "u1", "{}", "--if-match", "abc", "--if-absent",
        ]);
        assert!(conflicting.is_err());
    }

    #[test]
    fn test_event_range_args() {
        let args = RangeArgs {
            limit: Some(5),
            start: Some("1000".into()),
            after: None,
            before: None,
            end: Some("2014-04-01".into()),
        };
        let range = args.into_event_range();
        assert_eq!(range.start, Some(Timestamp::Millis(1000)));
        assert!(matches!(range.end, Some(Timestamp::Date(_))));
        assert_eq!(range.limit, Some(5));
    }
}
