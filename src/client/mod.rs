//! Rust SDK for the flag server.
//!
//! The client fetches every flag config for one project and environment, keeps them in an
//! in-memory snapshot, and answers flag checks locally without a network round trip. A
//! background task re-fetches on a fixed interval; when a refresh fails the last good
//! snapshot keeps being served.
//!
//! ```ignore
//! use flagpole::client::{ClientOptions, FlagsClient};
//! use flagpole::evaluation::Actor;
//!
//! let client = FlagsClient::new(
//!     ClientOptions::new("ffk_xxx", "storefront", "production")
//!         .base_url("https://flags.example.com"),
//! )
//! .await?;
//!
//! let actor = Actor::new("user-42");
//! if client.is_enabled("new-checkout", &actor) {
//!     // ...
//! }
//! let theme: String = client.get_value("theme", &actor, "light".to_string());
//! client.close();
//! ```

mod cache;
mod error;
mod fetcher;
mod options;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub use cache::{FlagCache, Snapshot};
pub use error::{ClientError, FetchError, InitializationError};
pub use fetcher::{ConfigFetcher, HttpConfigFetcher};
pub use options::{
    ClientOptions, DEFAULT_BASE_URL, DEFAULT_REFRESH_INTERVAL, DEFAULT_REQUEST_TIMEOUT,
};

use crate::evaluation::{evaluate_flag, Actor, EvaluationResult};

/// Counters describing background refresh activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientStats {
    pub refresh_successes: u64,
    pub refresh_failures: u64,
    pub last_refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct RefreshCounters {
    successes: AtomicU64,
    failures: AtomicU64,
}

/// Evaluates flags locally against a periodically refreshed config snapshot.
///
/// Query methods are synchronous and never perform I/O.
pub struct FlagsClient {
    cache: FlagCache,
    counters: Arc<RefreshCounters>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl FlagsClient {
    /// Validates `options`, fetches the initial configs over HTTP and starts polling.
    pub async fn new(options: ClientOptions) -> Result<Self, ClientError> {
        options.validate()?;
        let fetcher = HttpConfigFetcher::new(&options)?;
        Self::with_fetcher(options, fetcher).await
    }

    /// Like [`FlagsClient::new`] but with a caller-supplied config source.
    ///
    /// Must be called inside a Tokio runtime when `refresh_interval` is non-zero.
    pub async fn with_fetcher<F>(options: ClientOptions, fetcher: F) -> Result<Self, ClientError>
    where
        F: ConfigFetcher + 'static,
    {
        options.validate()?;

        let fetcher: Arc<dyn ConfigFetcher> = Arc::new(fetcher);
        let flags = fetcher.fetch_configs().await?;

        let cache = FlagCache::new(flags);
        info!(
            project = %options.project_key,
            environment = %options.environment_key,
            flags = cache.load().len(),
            "flags client initialized"
        );

        let counters = Arc::new(RefreshCounters::default());
        let refresh_task = if options.refresh_interval.is_zero() {
            None
        } else {
            Some(spawn_refresh_loop(
                fetcher,
                cache.clone(),
                Arc::clone(&counters),
                options.refresh_interval,
            ))
        };

        Ok(Self {
            cache,
            counters,
            refresh_task: Mutex::new(refresh_task),
        })
    }

    /// Evaluate one flag for `actor` against the cached configs.
    ///
    /// An unknown key is not an error: it yields a `flag not found` result.
    pub fn evaluate_flag(
        &self,
        flag_key: &str,
        actor: &Actor,
    ) -> Result<EvaluationResult, ClientError> {
        if flag_key.is_empty() {
            return Err(ClientError::MissingFlagKey);
        }
        if actor.id.is_empty() {
            return Err(ClientError::MissingActor);
        }

        let snapshot = self.cache.load();
        Ok(match snapshot.get(flag_key) {
            Some(config) => evaluate_flag(flag_key, config, actor),
            None => EvaluationResult::not_found(flag_key),
        })
    }

    /// Whether the flag is on for `actor`. Any failure reads as `false`.
    pub fn is_enabled(&self, flag_key: &str, actor: &Actor) -> bool {
        match self.evaluate_flag(flag_key, actor) {
            Ok(result) => result.enabled,
            Err(e) => {
                debug!(flag_key, error = %e, "is_enabled falling back to false");
                false
            }
        }
    }

    /// The flag's value for `actor`, or `fallback` when the flag is unknown, the input is
    /// invalid, or the value does not deserialize into `T`.
    pub fn get_value<T>(&self, flag_key: &str, actor: &Actor, fallback: T) -> T
    where
        T: DeserializeOwned,
    {
        let value = match self.evaluate_flag(flag_key, actor) {
            Ok(EvaluationResult { value: Some(value), .. }) => value,
            Ok(_) => return fallback,
            Err(e) => {
                debug!(flag_key, error = %e, "get_value falling back to caller default");
                return fallback;
            }
        };

        match serde_json::from_value(value.to_json()) {
            Ok(typed) => typed,
            Err(e) => {
                debug!(flag_key, error = %e, "flag value has unexpected type, using fallback");
                fallback
            }
        }
    }

    pub fn get_bool(&self, flag_key: &str, actor: &Actor, fallback: bool) -> bool {
        self.get_value(flag_key, actor, fallback)
    }

    pub fn get_string(&self, flag_key: &str, actor: &Actor, fallback: &str) -> String {
        self.get_value(flag_key, actor, fallback.to_string())
    }

    pub fn get_number(&self, flag_key: &str, actor: &Actor, fallback: f64) -> f64 {
        self.get_value(flag_key, actor, fallback)
    }

    pub fn get_json(
        &self,
        flag_key: &str,
        actor: &Actor,
        fallback: serde_json::Value,
    ) -> serde_json::Value {
        self.get_value(flag_key, actor, fallback)
    }

    /// Keys of every cached flag.
    pub fn flag_keys(&self) -> Vec<String> {
        let snapshot = self.cache.load();
        let mut keys: Vec<String> = snapshot.keys().map(str::to_string).collect();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            refresh_successes: self.counters.successes.load(Ordering::SeqCst),
            refresh_failures: self.counters.failures.load(Ordering::SeqCst),
            last_refreshed_at: self.cache.load().fetched_at(),
        }
    }

    /// Stop background refreshing. Safe to call more than once; cached configs stay readable.
    pub fn close(&self) {
        let handle = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            handle.abort();
            info!("flags client closed");
        }
    }
}

impl Drop for FlagsClient {
    fn drop(&mut self) {
        self.close();
    }
}

/// Poll `fetcher` every `interval`, replacing the cache on success.
///
/// Each fetch finishes before the next tick is awaited, so refreshes never overlap and a
/// slow fetch cannot overwrite a newer one. Ticks missed during a slow fetch are skipped.
fn spawn_refresh_loop(
    fetcher: Arc<dyn ConfigFetcher>,
    cache: FlagCache,
    counters: Arc<RefreshCounters>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match fetcher.fetch_configs().await {
                Ok(flags) => {
                    debug!(flags = flags.len(), "refreshed flag configs");
                    cache.replace(flags);
                    counters.successes.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    warn!(error = %e, "flag config refresh failed, serving cached configs");
                    counters.failures.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
    })
}
