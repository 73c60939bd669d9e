use clap::Parser;
use installment_conditions::application::cache::ConditionsCache;
use installment_conditions::application::circuit_breaker::CircuitBreaker;
use installment_conditions::application::client::ResilientClient;
use installment_conditions::application::normalizer::InstallmentNormalizer;
use installment_conditions::application::service::{ConditionsOutcome, PaymentConditionsService};
use installment_conditions::config::ServiceConfig;
use installment_conditions::domain::cart::CartSnapshot;
use installment_conditions::domain::money::Currency;
use installment_conditions::domain::ports::ClockRef;
use installment_conditions::infrastructure::clock::SystemClock;
use installment_conditions::infrastructure::http::HttpUpstream;
use installment_conditions::infrastructure::in_memory::{InMemoryCacheStore, InMemoryCircuitStore};
use installment_conditions::interfaces::csv::cart_reader::CartReader;
use installment_conditions::interfaces::csv::plan_writer::PlanWriter;
use installment_conditions::telemetry;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Cart CSV file with `sku,quantity,unit_price` columns
    cart: PathBuf,

    /// ISO 4217 currency of the cart
    #[arg(long, env = "CONDITIONS_CURRENCY")]
    currency: Currency,

    /// Authorization service URL; overrides the config file
    #[arg(long, env = "CONDITIONS_ENDPOINT")]
    endpoint: Option<String>,

    /// JSON config file
    #[arg(long, env = "CONDITIONS_CONFIG")]
    config: Option<PathBuf>,

    /// Per-attempt timeout in milliseconds; overrides the config file
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[arg(long, env = "CONDITIONS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(&cli.log_level, cli.log_json);

    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_file(path).into_diagnostic()?,
        None => ServiceConfig::default(),
    };
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = Some(endpoint);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.client.timeout_ms = timeout_ms;
    }
    let endpoint = config.require_endpoint().into_diagnostic()?.to_string();

    // Stores live for the whole process and are shared through the service.
    let clock: ClockRef = Arc::new(SystemClock);
    let breaker = Arc::new(CircuitBreaker::new(
        Box::new(InMemoryCircuitStore::new()),
        clock.clone(),
        config.breaker.clone(),
    ));
    let upstream = HttpUpstream::new(endpoint).into_diagnostic()?;
    let client = ResilientClient::new(Box::new(upstream), breaker, config.client.clone());
    let cache = ConditionsCache::new(Box::new(InMemoryCacheStore::new(clock.clone())), clock);
    let service = PaymentConditionsService::new(
        cache,
        client,
        InstallmentNormalizer::with_max_installments(config.max_installments),
        config.cache_ttl(),
    );

    let file = File::open(&cli.cart).into_diagnostic()?;
    let items = CartReader::new(file)
        .line_items(cli.currency)
        .into_diagnostic()?;
    let cart = CartSnapshot::new(cli.currency, items).into_diagnostic()?;

    let outcome = service.get(&cart).await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = PlanWriter::new(stdout.lock());
    match outcome {
        ConditionsOutcome::Available { plan, .. } => {
            writer.write_plan(&plan).into_diagnostic()?;
        }
        ConditionsOutcome::Unavailable { reason } => {
            eprintln!("WARNING: payment conditions unavailable ({reason:?}), continuing without installments");
            writer.write_empty().into_diagnostic()?;
        }
    }

    Ok(())
}
