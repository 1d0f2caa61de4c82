//! CLI definition and dispatch.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_cache::{CsvCache, cache_stats};
use crate::adapters::csv_price_loader::CsvPriceLoader;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::jquants_client::JQuantsClient;
use crate::adapters::local_store::LocalObjectStore;
use crate::domain::app_config::{API_KEY_ENV, AppConfig};
use crate::domain::datalake::{self, DataType};
use crate::domain::error::StockStudyError;
use crate::domain::indicator::{IndicatorRow, compute_indicators};
use crate::domain::presentation::{
    TechnicalRecord, daily_quotes_view, has_close, search_stocks, technical_records,
};
use crate::domain::price::PriceSeries;
use crate::ports::object_store_port::ObjectStore;
use crate::ports::quote_port::QuotePort;

#[derive(Parser, Debug)]
#[command(
    name = "stockstudy",
    about = "Japanese equity quotes, technical indicators and data-lake jobs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute indicators for a local `date,close` CSV file
    Indicators {
        #[arg(short, long)]
        input: PathBuf,
        /// Sort rows, keep the last of a repeated date and allow missing closes
        #[arg(long)]
        lenient: bool,
    },
    /// Fetch daily bars and print technical indicators
    Technical {
        #[arg(long)]
        code: String,
        #[arg(long, default_value = "")]
        from: String,
        #[arg(long, default_value = "")]
        to: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Fetch daily bars
    Daily {
        #[arg(long)]
        code: String,
        #[arg(long, default_value = "")]
        from: String,
        #[arg(long, default_value = "")]
        to: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Fetch financial statement summaries for one issue
    Financials {
        #[arg(long)]
        code: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Search the listed-issue master by code or company name
    Search {
        #[arg(short, long, default_value = "")]
        query: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Start the HTTP API
    Serve {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show response cache statistics
    CacheStats {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Fetch upstream data into the raw layer
    Ingest {
        #[arg(long)]
        data_type: String,
        #[arg(long, default_value = "")]
        from: String,
        #[arg(long, default_value = "")]
        to: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Normalize the latest raw partition into the processed layer
    Transform {
        /// Only this data type; all types when omitted
        #[arg(long)]
        data_type: Option<String>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Compute technical indicators into the analytics layer
    Enrich {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Indicators { input, lenient } => run_indicators(&input, lenient),
        Command::Technical {
            code,
            from,
            to,
            config,
        } => run_technical(config.as_ref(), &code, &from, &to),
        Command::Daily {
            code,
            from,
            to,
            config,
        } => run_daily(config.as_ref(), &code, &from, &to),
        Command::Financials { code, config } => run_financials(config.as_ref(), &code),
        Command::Search { query, config } => run_search(config.as_ref(), &query),
        Command::Serve { config } => run_serve(config.as_ref()),
        Command::CacheStats { config } => run_cache_stats(config.as_ref()),
        Command::Ingest {
            data_type,
            from,
            to,
            config,
        } => run_ingest(config.as_ref(), &data_type, &from, &to),
        Command::Transform { data_type, config } => {
            run_transform(config.as_ref(), data_type.as_deref())
        }
        Command::Enrich { config } => run_enrich(config.as_ref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }
    }
}

/// Settings from `path` (defaults when absent) with the environment API key applied.
pub fn load_app_config(path: Option<&PathBuf>) -> Result<AppConfig, StockStudyError> {
    let adapter = match path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            FileConfigAdapter::from_file(path)?
        }
        None => FileConfigAdapter::empty(),
    };
    AppConfig::load(&adapter, std::env::var(API_KEY_ENV).ok())
}

/// Upstream client behind the day-scoped CSV cache.
pub fn build_quote_port(config: &AppConfig) -> Result<CsvCache<JQuantsClient>, StockStudyError> {
    let client = JQuantsClient::from_config(config)?;
    Ok(CsvCache::new(client, config.cache_dir.clone()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), StockStudyError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct IndicatorOutput {
    pub date: NaiveDate,
    pub close: f64,
    #[serde(flatten)]
    pub indicators: IndicatorRow,
}

pub fn indicator_output(series: &PriceSeries) -> Vec<IndicatorOutput> {
    series
        .points()
        .iter()
        .zip(compute_indicators(series))
        .map(|(point, indicators)| IndicatorOutput {
            date: point.date,
            close: point.close,
            indicators,
        })
        .collect()
}

fn run_indicators(input: &PathBuf, lenient: bool) -> Result<(), StockStudyError> {
    let loader = CsvPriceLoader::new(input);
    if lenient {
        let bars = loader.load_bars("")?;
        eprintln!("Loaded {} rows from {}", bars.len(), input.display());
        return print_json(&technical_records(&bars));
    }

    let series = loader.load_series()?;
    eprintln!("Loaded {} rows from {}", series.len(), input.display());
    print_json(&indicator_output(&series))
}

fn run_technical(
    config: Option<&PathBuf>,
    code: &str,
    from: &str,
    to: &str,
) -> Result<(), StockStudyError> {
    let config = load_app_config(config)?;
    let quotes = build_quote_port(&config)?;
    let bars = quotes.daily_quotes(code, from, to)?;
    eprintln!("Fetched {} daily bars for {}", bars.len(), code);
    if !has_close(&bars) {
        return print_json(&Vec::<TechnicalRecord>::new());
    }
    print_json(&technical_records(&bars))
}

fn run_daily(
    config: Option<&PathBuf>,
    code: &str,
    from: &str,
    to: &str,
) -> Result<(), StockStudyError> {
    let config = load_app_config(config)?;
    let quotes = build_quote_port(&config)?;
    let bars = quotes.daily_quotes(code, from, to)?;
    eprintln!("Fetched {} daily bars for {}", bars.len(), code);
    print_json(&daily_quotes_view(&bars))
}

fn run_financials(config: Option<&PathBuf>, code: &str) -> Result<(), StockStudyError> {
    let config = load_app_config(config)?;
    let quotes = build_quote_port(&config)?;
    let statements = quotes.financials(code)?;
    eprintln!("Fetched {} statements for {}", statements.len(), code);
    print_json(&statements)
}

fn run_search(config: Option<&PathBuf>, query: &str) -> Result<(), StockStudyError> {
    let config = load_app_config(config)?;
    let quotes = build_quote_port(&config)?;
    let master = quotes.stock_master("")?;
    let matches = search_stocks(&master, query);
    eprintln!("{} of {} issues match '{}'", matches.len(), master.len(), query);
    print_json(&matches)
}

fn run_cache_stats(config: Option<&PathBuf>) -> Result<(), StockStudyError> {
    let config = load_app_config(config)?;
    print_json(&cache_stats(&config.cache_dir)?)
}

fn run_ingest(
    config: Option<&PathBuf>,
    data_type: &str,
    from: &str,
    to: &str,
) -> Result<(), StockStudyError> {
    let data_type: DataType = data_type.parse()?;
    let config = load_app_config(config)?;
    let quotes = build_quote_port(&config)?;
    let store = LocalObjectStore::new(config.datalake_root.clone());

    let outcome = datalake::ingest(&quotes, &store, data_type, from, to, Utc::now())?;
    eprintln!(
        "Ingested {} {} records",
        outcome.record_count, outcome.data_type
    );
    print_json(&outcome)
}

/// Transform `data_type`, or every data type when `None`, returning per-type
/// row counts.
pub fn transform_types(
    store: &dyn ObjectStore,
    data_type: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<(DataType, usize)>, StockStudyError> {
    let types = match data_type {
        Some(name) => vec![name.parse::<DataType>()?],
        None => DataType::ALL.to_vec(),
    };
    types
        .into_iter()
        .map(|t| datalake::transform(store, t, now).map(|count| (t, count)))
        .collect()
}

fn run_transform(config: Option<&PathBuf>, data_type: Option<&str>) -> Result<(), StockStudyError> {
    let config = load_app_config(config)?;
    let store = LocalObjectStore::new(config.datalake_root.clone());

    let mut total = 0;
    for (data_type, count) in transform_types(&store, data_type, Utc::now())? {
        eprintln!("{}: {} records transformed", data_type, count);
        total += count;
    }
    eprintln!("Transform complete: {} records", total);
    Ok(())
}

fn run_enrich(config: Option<&PathBuf>) -> Result<(), StockStudyError> {
    let config = load_app_config(config)?;
    let store = LocalObjectStore::new(config.datalake_root.clone());
    let outcome = datalake::enrich(&store, Utc::now())?;
    eprintln!(
        "Enriched {} instruments ({} records)",
        outcome.instruments, outcome.record_count
    );
    print_json(&outcome)
}

fn run_serve(config_path: Option<&PathBuf>) -> Result<(), StockStudyError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, build_router, cors_layer};
        use std::sync::Arc;

        let config = load_app_config(config_path)?;
        let quotes: Arc<dyn QuotePort> = Arc::new(build_quote_port(&config)?);
        let cors = cors_layer(&config.cors_origins, config.cors_allow_credentials)?;

        let state = AppState {
            quotes: Arc::clone(&quotes),
            api_key_configured: config.api_key_configured(),
            cache_dir: config.cache_dir.clone(),
        };
        let router = build_router(state, cors);

        if !config.api_key_configured() {
            eprintln!("warning: no API key configured; upstream calls will fail");
        }
        eprintln!("Starting web server on {}", config.listen);

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(config.listen).await?;
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await
        })?;
        // the blocking HTTP client must be released outside the runtime
        drop(runtime);
        drop(quotes);
        Ok(())
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        Err(StockStudyError::InvalidInput {
            source_name: "serve".to_string(),
            reason: "the web feature is required".to_string(),
        })
    }
}
