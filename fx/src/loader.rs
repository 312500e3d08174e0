//! Ordered-endpoint rate loading with a static fallback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::error::FxResult;
use crate::provider::RateSource;
use crate::rate_table::RateTable;

/// Primary CDN mirror of the public currency API.
pub const JSDELIVR_ENDPOINT: &str =
    "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@latest/v1/currencies/usd.json";

/// Secondary mirror, tried only after the primary fails.
pub const GITHUB_PAGES_ENDPOINT: &str =
    "https://api.fawazahmed0.github.io/currency-api/v1/currencies/usd.json";

/// Configuration for the rate loader.
#[derive(Debug, Clone)]
pub struct RateLoaderConfig {
    /// Endpoints in preference order.
    pub endpoints: Vec<String>,
    /// How long the error indicator stays raised after a fallback.
    pub error_display: Duration,
}

impl Default for RateLoaderConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                JSDELIVR_ENDPOINT.to_string(),
                GITHUB_PAGES_ENDPOINT.to_string(),
            ],
            error_display: Duration::from_millis(3000),
        }
    }
}

/// Loading and error indicators published to the rendering surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStatus {
    /// A load is in flight.
    pub loading: bool,
    /// The last load fell back to the static table.
    pub error: bool,
}

/// Where a loaded table came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateOrigin {
    /// First endpoint that answered with a usable payload.
    Remote { endpoint: String },
    /// Embedded fallback table.
    Fallback,
}

/// Result of a load.
#[derive(Debug, Clone)]
pub struct LoadedRates {
    pub table: RateTable,
    pub origin: RateOrigin,
}

impl LoadedRates {
    /// Whether the fallback table was used.
    pub fn is_fallback(&self) -> bool {
        self.origin == RateOrigin::Fallback
    }
}

/// Loads USD-based rates from an ordered list of endpoints.
pub struct RateLoader {
    source: Arc<dyn RateSource>,
    config: RateLoaderConfig,
    status: Arc<watch::Sender<LoadStatus>>,
    generation: Arc<AtomicU64>,
}

impl RateLoader {
    /// Create a new loader over the given source.
    pub fn new(source: Arc<dyn RateSource>, config: RateLoaderConfig) -> Self {
        let (status, _) = watch::channel(LoadStatus::default());
        Self {
            source,
            config,
            status: Arc::new(status),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribe to loading/error indicator changes.
    pub fn subscribe(&self) -> watch::Receiver<LoadStatus> {
        self.status.subscribe()
    }

    /// Current indicator state.
    pub fn status(&self) -> LoadStatus {
        *self.status.borrow()
    }

    /// Configured endpoints in preference order.
    pub fn endpoints(&self) -> &[String] {
        &self.config.endpoints
    }

    /// Load rates. Never fails: if every endpoint fails the embedded
    /// fallback table is returned and the error indicator is raised.
    #[instrument(skip(self), fields(source = self.source.name(), endpoints = self.config.endpoints.len()))]
    pub async fn load(&self) -> LoadedRates {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.status.send_modify(|s| {
            s.loading = true;
            s.error = false;
        });

        let loaded = match self.first_success().await {
            Some((endpoint, table)) => {
                info!(endpoint = %endpoint, rates = table.len(), "Loaded exchange rates");
                LoadedRates {
                    table,
                    origin: RateOrigin::Remote { endpoint },
                }
            }
            None => {
                warn!("All rate endpoints failed, using fallback rates");
                LoadedRates {
                    table: RateTable::fallback(),
                    origin: RateOrigin::Fallback,
                }
            }
        };

        let fell_back = loaded.is_fallback();
        self.status.send_modify(|s| {
            s.loading = false;
            s.error = fell_back;
        });
        if fell_back {
            self.schedule_error_clear(generation);
        }

        loaded
    }

    /// Try each endpoint in order; the first usable table wins.
    async fn first_success(&self) -> Option<(String, RateTable)> {
        for endpoint in &self.config.endpoints {
            match self.attempt(endpoint).await {
                Ok(table) => return Some((endpoint.clone(), table)),
                Err(e) => {
                    warn!(endpoint = %endpoint, error = %e, "Rate endpoint failed, trying next");
                }
            }
        }
        None
    }

    async fn attempt(&self, endpoint: &str) -> FxResult<RateTable> {
        let payload = self.source.fetch(endpoint).await?;
        RateTable::from_payload(&payload)
    }

    /// Clear the error indicator after the display interval, unless a newer
    /// load has started in the meantime.
    fn schedule_error_clear(&self, generation: u64) {
        let status = Arc::clone(&self.status);
        let current = Arc::clone(&self.generation);
        let delay = self.config.error_display;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if current.load(Ordering::SeqCst) == generation {
                debug!("Clearing rate error indicator");
                status.send_modify(|s| s.error = false);
            }
        });
    }
}
