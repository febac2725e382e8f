//! Search-API quota tracker and backpressure governor.
//!
//! One [`QuotaTracker`] is built per process and shared as
//! `Arc<QuotaTracker>` with every worker. Every outbound search call goes
//! through [`QuotaTracker::try_acquire`]; responses report back through
//! [`QuotaTracker::register_success`] or [`QuotaTracker::register_throttled`].
//!
//! State sits behind a `std::sync::Mutex`. No method awaits while holding the
//! lock, so check-then-increment is atomic with respect to other tasks.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use leadscout_shared::{EnrichError, QuotaConfig, QuotaReset, Result};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct QuotaState {
    /// Day the counter belongs to (UTC).
    day: NaiveDate,
    queries_today: u64,
    consecutive_throttled: u32,
    exceeded: bool,
    last_throttled_at: Option<DateTime<Utc>>,
}

/// Point-in-time view of the tracker, for status output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaStatus {
    pub queries_today: u64,
    pub daily_limit: u64,
    pub remaining_queries: u64,
    pub consecutive_throttled: u32,
    pub throttle_trip_threshold: u32,
    pub exceeded: bool,
    pub last_throttled_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// QuotaTracker
// ---------------------------------------------------------------------------

/// Process-wide search quota governor.
#[derive(Debug)]
pub struct QuotaTracker {
    config: QuotaConfig,
    state: Mutex<QuotaState>,
}

impl QuotaTracker {
    /// Create a tracker with a zeroed counter for today.
    pub fn new(config: QuotaConfig) -> Self {
        Self::starting_on(config, Utc::now().date_naive())
    }

    fn starting_on(config: QuotaConfig, day: NaiveDate) -> Self {
        info!(
            daily_limit = config.daily_limit,
            trip_threshold = config.throttle_trip_threshold,
            reset = ?config.reset,
            "quota tracker initialised"
        );
        Self {
            config,
            state: Mutex::new(QuotaState {
                day,
                queries_today: 0,
                consecutive_throttled: 0,
                exceeded: false,
                last_throttled_at: None,
            }),
        }
    }

    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    /// Count one outbound search query.
    pub fn register_query(&self) {
        self.register_query_on(Utc::now().date_naive());
    }

    fn register_query_on(&self, today: NaiveDate) {
        let mut state = self.lock(today);
        state.queries_today += 1;
        self.refresh(&mut state);
        debug!(queries_today = state.queries_today, "search query registered");
    }

    /// Atomically check the quota and count one query.
    ///
    /// Returns [`EnrichError::QuotaExceeded`] without counting if the quota is
    /// already exhausted.
    pub fn try_acquire(&self) -> Result<()> {
        self.try_acquire_on(Utc::now().date_naive())
    }

    fn try_acquire_on(&self, today: NaiveDate) -> Result<()> {
        let mut state = self.lock(today);
        if state.exceeded {
            return Err(self.exceeded_error(&state));
        }
        state.queries_today += 1;
        self.refresh(&mut state);
        debug!(queries_today = state.queries_today, "search query acquired");
        Ok(())
    }

    /// Record an HTTP 429 from the search endpoint.
    pub fn register_throttled(&self) {
        let now = Utc::now();
        let mut state = self.lock(now.date_naive());
        state.consecutive_throttled += 1;
        state.last_throttled_at = Some(now);
        self.refresh(&mut state);
        warn!(
            consecutive = state.consecutive_throttled,
            threshold = self.config.throttle_trip_threshold,
            "search endpoint throttled"
        );
    }

    /// Record a successful search response.
    pub fn register_success(&self) {
        let mut state = self.lock(Utc::now().date_naive());
        if state.consecutive_throttled > 0 {
            debug!(
                cleared = state.consecutive_throttled,
                "throttle streak cleared"
            );
        }
        state.consecutive_throttled = 0;
        self.refresh(&mut state);
    }

    /// Daily ceiling reached, or throttle streak at the trip threshold.
    pub fn is_exceeded(&self) -> bool {
        self.lock(Utc::now().date_naive()).exceeded
    }

    /// `Err(QuotaExceeded)` if [`is_exceeded`](Self::is_exceeded).
    pub fn ensure_available(&self) -> Result<()> {
        let state = self.lock(Utc::now().date_naive());
        if state.exceeded {
            return Err(self.exceeded_error(&state));
        }
        Ok(())
    }

    /// Snapshot for status reporting.
    pub fn status(&self) -> QuotaStatus {
        let state = self.lock(Utc::now().date_naive());
        QuotaStatus {
            queries_today: state.queries_today,
            daily_limit: self.config.daily_limit,
            remaining_queries: self.config.daily_limit.saturating_sub(state.queries_today),
            consecutive_throttled: state.consecutive_throttled,
            throttle_trip_threshold: self.config.throttle_trip_threshold,
            exceeded: state.exceeded,
            last_throttled_at: state.last_throttled_at,
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Lock the state, rolling the daily counter over if the day changed.
    fn lock(&self, today: NaiveDate) -> MutexGuard<'_, QuotaState> {
        // A poisoned lock only means another thread panicked mid-update;
        // the counters are still usable.
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if self.config.reset == QuotaReset::Daily && today > state.day {
            info!(
                previous_day = %state.day,
                queries = state.queries_today,
                "new day, resetting search quota counter"
            );
            state.day = today;
            state.queries_today = 0;
            self.refresh(&mut state);
        }
        state
    }

    fn refresh(&self, state: &mut QuotaState) {
        let was_exceeded = state.exceeded;
        state.exceeded = state.queries_today >= self.config.daily_limit
            || state.consecutive_throttled >= self.config.throttle_trip_threshold;

        if state.exceeded && !was_exceeded {
            warn!(
                queries_today = state.queries_today,
                daily_limit = self.config.daily_limit,
                consecutive_throttled = state.consecutive_throttled,
                "search quota exceeded"
            );
        }
    }

    fn exceeded_error(&self, state: &QuotaState) -> EnrichError {
        EnrichError::QuotaExceeded {
            queries_today: state.queries_today,
            daily_limit: self.config.daily_limit,
            consecutive_throttled: state.consecutive_throttled,
        }
    }
}
