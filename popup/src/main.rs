//! RatePivot command-line converter
//!
//! Front end for the popup session: loads rates, drives field edits and
//! writes the field layout the way the settings page does.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ratepivot_common::{known_currencies, CurrencyCode};
use ratepivot_fx::format::{result_text, PROMPT_TEXT};
use ratepivot_fx::{convert_pair, parse_amount, HttpRateSource, RateLoader, RateOrigin};
use ratepivot_popup::{
    AppConfig, FieldConfig, FieldView, JsonFileStore, KeyValueStore, PopupController, Variant,
    CONFIG_KEY,
};

/// RatePivot CLI
#[derive(Parser, Debug)]
#[command(name = "ratepivot")]
#[command(about = "Convert between a configurable set of currencies")]
struct Args {
    /// Key-value store file holding the field layout
    #[arg(long)]
    store: Option<PathBuf>,

    /// Rate endpoint; repeat to build the fallback order
    #[arg(long = "endpoint")]
    endpoints: Vec<String>,

    /// Default field layout (standard or simple)
    #[arg(long)]
    variant: Option<Variant>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load rates and print them
    Rates {
        /// Only print these currencies
        currencies: Vec<String>,
    },
    /// Convert one amount between two currencies
    Convert {
        amount: String,
        from: String,
        to: String,
    },
    /// Type an amount into a field and print every field
    Fields {
        /// Field number, starting at 1
        field: usize,
        amount: String,
    },
    /// Save the field layout (1 to 5 currencies)
    Configure {
        #[arg(required = true, num_args = 1..=5)]
        currencies: Vec<String>,
    },
    /// List known currencies
    Currencies,
    /// Edit fields line by line
    Interactive,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = build_config(&args);

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
    );
    if args.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let file_store = Arc::new(JsonFileStore::new(&config.store_path));
    let store: Arc<dyn KeyValueStore> = file_store.clone();
    info!(store = %config.store_path.display(), variant = %config.variant, "Starting RatePivot");

    match args.command {
        Command::Rates { currencies } => {
            let loader = build_loader(&config)?;
            let loaded = loader.load().await;
            print_origin(&loaded.origin);

            let wanted: Vec<CurrencyCode> = currencies.iter().map(CurrencyCode::new).collect();
            for (code, rate) in loaded.table.iter() {
                if wanted.is_empty() || wanted.contains(code) {
                    println!("{:<6} {}", code.upper(), rate);
                }
            }
        }
        Command::Convert { amount, from, to } => {
            let loader = build_loader(&config)?;
            let rates = loader.load().await.table;
            let (from, to) = (CurrencyCode::new(from), CurrencyCode::new(to));

            let text = parse_amount(&amount)
                .and_then(|amount| convert_pair(amount, &from, &to, &rates))
                .map(|converted| result_text(converted, &to))
                .unwrap_or_else(|| PROMPT_TEXT.to_string());
            println!("{text}");
        }
        Command::Fields { field, amount } => {
            let mut popup = PopupController::new(store, build_loader(&config)?, config.variant);
            let origin = popup.load_rates().await;
            print_origin(&origin);

            let views = popup.on_field_edited(field.saturating_sub(1), &amount);
            print_views(&views);
        }
        Command::Configure { currencies } => {
            let layout = FieldConfig::new(currencies.iter().map(CurrencyCode::new).collect())?;
            for code in layout.slots().iter().filter(|c| !c.is_known()) {
                warn!(currency = %code, "Currency is not in the known list");
            }
            layout.save(store.as_ref())?;
            println!("Saved {} field(s) to {}", layout.len(), config.store_path.display());
        }
        Command::Currencies => {
            for code in known_currencies() {
                println!("{}", code.label());
            }
        }
        Command::Interactive => {
            // Picks up layouts saved by `ratepivot configure` elsewhere.
            let _watcher = JsonFileStore::watch(&file_store, config.store_poll);
            let mut popup =
                PopupController::new(Arc::clone(&store), build_loader(&config)?, config.variant);
            let origin = popup.load_rates().await;
            print_origin(&origin);
            run_interactive(popup, store).await?;
        }
    }

    Ok(())
}

fn build_config(args: &Args) -> AppConfig {
    let mut config = AppConfig::from_env();
    if let Some(store) = &args.store {
        config.store_path = store.clone();
    }
    if !args.endpoints.is_empty() {
        config.endpoints = args.endpoints.clone();
    }
    if let Some(variant) = args.variant {
        config.variant = variant;
    }
    config
}

fn build_loader(config: &AppConfig) -> anyhow::Result<RateLoader> {
    let source = Arc::new(HttpRateSource::new(config.http.timeout)?);
    Ok(RateLoader::new(source, config.loader_config()))
}

fn print_origin(origin: &RateOrigin) {
    match origin {
        RateOrigin::Remote { endpoint } => info!(endpoint = %endpoint, "Using live rates"),
        RateOrigin::Fallback => eprintln!("Could not load live rates, using built-in rates"),
    }
}

fn print_views(views: &[FieldView]) {
    for view in views {
        match &view.secondary {
            Some(lakh) => println!(
                "{}. {:<26} {:>16}  ({})",
                view.index + 1,
                view.label,
                view.primary,
                lakh
            ),
            None => println!("{}. {:<26} {:>16}", view.index + 1, view.label, view.primary),
        }
    }
}

const INTERACTIVE_HELP: &str = "\
Commands:
  <field> <amount>   type an amount into a field (fields start at 1)
  set <code>...      save a new field layout (1 to 5 codes)
  reload             fetch rates again
  quit               exit";

async fn run_interactive(
    mut popup: PopupController,
    store: Arc<dyn KeyValueStore>,
) -> anyhow::Result<()> {
    let mut changes = popup.storage_changes();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{INTERACTIVE_HELP}");
    print_views(&popup.render());

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let words: Vec<&str> = line.split_whitespace().collect();
                match words.as_slice() {
                    [] => {}
                    ["quit"] | ["exit"] => break,
                    ["reload"] => {
                        let origin = popup.load_rates().await;
                        print_origin(&origin);
                        print_views(&popup.render());
                    }
                    ["set", codes @ ..] => {
                        match FieldConfig::new(codes.iter().map(CurrencyCode::new).collect()) {
                            Ok(layout) => layout.save(store.as_ref())?,
                            Err(e) => eprintln!("{e}"),
                        }
                    }
                    [field, amount] => match field.parse::<usize>() {
                        Ok(field) if field >= 1 => {
                            print_views(&popup.on_field_edited(field - 1, amount));
                        }
                        _ => eprintln!("{INTERACTIVE_HELP}"),
                    },
                    _ => eprintln!("{INTERACTIVE_HELP}"),
                }
            }
            changed = changes.recv() => match changed {
                Ok(key) => {
                    if popup.on_storage_changed(&key) {
                        print_views(&popup.render());
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed storage notifications, re-reading layout");
                    popup.on_storage_changed(CONFIG_KEY);
                    print_views(&popup.render());
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}
