//! oxide-native CLI
//!
//! Command-line tool for inspecting dialect output and native query
//! parameter expansion.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use oxide_dialect::{
    Dialect, DialectSettings, JdbcError, LockMode, Product, SqlValue, SqlxProbe, TypeCode,
};
use oxide_native::parameter::{
    expand_parameter_lists, recognize, ExpansionOptions, ParameterBindings, ParameterKey,
};
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Dialect and native query tooling.
#[derive(Parser)]
#[command(name = "oxide-native")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database product (hana, hana-cloud, postgresql, sqlite).
    #[arg(short, long, env = "OXIDE_DIALECT", default_value = "hana")]
    dialect: String,

    /// JSON file with dialect settings.
    #[arg(short, long, env = "OXIDE_SETTINGS")]
    settings: Option<PathBuf>,

    /// Database URL to probe for runtime defaults.
    #[arg(long, env = "DATABASE_URL")]
    database: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the DDL column type for a type code.
    ColumnType {
        /// Type name (`varchar`) or numeric code (`12`).
        type_code: String,

        #[arg(short, long)]
        length: Option<u32>,

        #[arg(short, long)]
        precision: Option<u32>,

        #[arg(long)]
        scale: Option<u32>,
    },

    /// Print the row-lock clause.
    Lock {
        /// Lock mode, e.g. `pessimistic-write`.
        #[arg(short, long, default_value = "pessimistic-write")]
        mode: String,

        /// Wait timeout in milliseconds; 0 is nowait, -1 waits forever.
        #[arg(short, long, default_value_t = -1, allow_hyphen_values = true)]
        timeout: i64,

        /// Table aliases to lock.
        aliases: Vec<String>,
    },

    /// Classify a driver error.
    Classify {
        /// Vendor error code.
        #[arg(short, long, allow_hyphen_values = true)]
        code: i32,

        #[arg(long)]
        sql_state: Option<String>,

        #[arg(short, long, default_value = "")]
        message: String,

        #[arg(long, default_value = "")]
        sql: String,
    },

    /// Expand list parameters in a statement.
    Expand {
        sql: String,

        /// List binding as `name=v1,v2,...`; `1=...` binds a positional
        /// parameter.
        #[arg(short, long = "bind")]
        bindings: Vec<String>,

        /// Pad lists to the next power of two.
        #[arg(long)]
        padding: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let dialect = load_dialect(&cli).await?;
    info!(dialect = dialect.name(), "Using dialect");

    match cli.command {
        Commands::ColumnType {
            type_code,
            length,
            precision,
            scale,
        } => {
            let code: TypeCode = type_code.parse()?;
            println!("{}", dialect.column_type(code, length, precision, scale)?);
        }

        Commands::Lock {
            mode,
            timeout,
            aliases,
        } => {
            let mode: LockMode = mode.parse()?;
            let aliases: Vec<&str> = aliases.iter().map(String::as_str).collect();
            println!("{}", dialect.for_update_clause(&aliases, mode, timeout));
        }

        Commands::Classify {
            code,
            sql_state,
            message,
            sql,
        } => {
            let mut error = JdbcError::new(code, message);
            if let Some(state) = sql_state {
                error = error.with_sql_state(state);
            }
            println!("{:?}", dialect.classify(&error));
            println!("{}", dialect.convert(error, &sql));
        }

        Commands::Expand {
            sql,
            bindings,
            padding,
        } => {
            let interpretation = recognize(&sql)?;
            let mut values = ParameterBindings::new(interpretation.parameters().clone());
            for binding in &bindings {
                let (key, list) = binding
                    .split_once('=')
                    .with_context(|| format!("binding '{binding}' is not name=values"))?;
                let key = parameter_key(key);
                let list: Vec<SqlValue> = list
                    .split(',')
                    .filter(|v| !v.is_empty())
                    .map(literal)
                    .collect();
                values.bind_list(key, list)?;
            }

            let options = ExpansionOptions {
                padding,
                in_expression_limit: dialect.in_expression_count_limit(),
            };
            let expanded = expand_parameter_lists(
                interpretation.adjusted_sql(),
                interpretation.occurrences(),
                &values,
                options,
            );
            println!("{expanded}");
            for value in values.flatten(interpretation.occurrences(), options)? {
                println!("  {}", value.to_sql_inline());
            }
        }
    }

    Ok(())
}

/// Builds the dialect from product defaults, an optional live probe and
/// the settings file.
async fn load_dialect(cli: &Cli) -> anyhow::Result<Dialect> {
    let product: Product = cli.dialect.parse()?;
    let settings = match &cli.settings {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            DialectSettings::from_json(&json)?
        }
        None => DialectSettings::default(),
    };

    let Some(url) = &cli.database else {
        return Ok(Dialect::configured(product, &settings));
    };
    debug!(url = %url, "Probing database");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(url)
        .await?;
    let probe = SqlxProbe::new(pool);
    Ok(Dialect::new(product).contribute(&probe, &settings).await)
}

/// `?2` and `2` are positional, `:ids` and `ids` are named.
fn parameter_key(text: &str) -> ParameterKey {
    text.trim_start_matches('?')
        .parse::<u32>()
        .map_or_else(|_| ParameterKey::from(text.trim_start_matches(':')), ParameterKey::from)
}

fn literal(text: &str) -> SqlValue {
    text.parse::<i64>()
        .map_or_else(|_| SqlValue::Text(text.to_string()), SqlValue::Int)
}
