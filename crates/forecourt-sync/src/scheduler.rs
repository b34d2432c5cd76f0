//! Auto-sync scheduler
//!
//! The [`AutoSyncScheduler`] owns the single background flush timer. The
//! engine publishes [`SchedulerSettings`] on a watch channel whenever the
//! configuration changes; the scheduler rebuilds its interval in place,
//! so there is exactly one timer at any moment regardless of how often
//! the interval is reconfigured.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use forecourt_core::config::SyncConfig;

use crate::engine::SyncEngine;

// ============================================================================
// SchedulerSettings
// ============================================================================

/// The slice of the configuration the scheduler reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Milliseconds between automatic flushes
    pub interval_ms: u64,
    /// Whether automatic flushes happen at all
    pub enabled: bool,
}

impl From<&SyncConfig> for SchedulerSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            interval_ms: config.sync_interval_ms,
            enabled: config.auto_sync_enabled,
        }
    }
}

// ============================================================================
// AutoSyncScheduler
// ============================================================================

/// Periodic flush trigger with live reconfiguration
pub struct AutoSyncScheduler {
    engine: Arc<SyncEngine>,
}

impl AutoSyncScheduler {
    /// Creates a scheduler bound to an engine
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }

    /// Main timer loop
    ///
    /// Each tick spawns a guarded flush (the engine's own flag makes an
    /// overlapping tick harmless). Settings changes rebuild the interval
    /// without spawning a second timer. The loop terminates when the
    /// engine's settings channel closes.
    pub async fn run(&self) {
        let mut settings_rx = self.engine.scheduler_settings();
        let mut settings = *settings_rx.borrow_and_update();
        let mut timer = build_timer(settings.interval_ms);

        info!(
            interval_ms = settings.interval_ms,
            enabled = settings.enabled,
            "Auto-sync scheduler starting"
        );

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    if settings.enabled {
                        debug!("Scheduled flush tick");
                        self.engine.spawn_flush();
                    }
                }

                changed = settings_rx.changed() => {
                    match changed {
                        Ok(()) => {
                            settings = *settings_rx.borrow_and_update();
                            timer = build_timer(settings.interval_ms);
                            info!(
                                interval_ms = settings.interval_ms,
                                enabled = settings.enabled,
                                "Scheduler settings updated, timer re-armed"
                            );
                        }
                        Err(_) => {
                            info!("Settings channel closed, scheduler stopping");
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Builds the flush interval; the first tick fires one full period out
fn build_timer(interval_ms: u64) -> Interval {
    let period = Duration::from_millis(interval_ms.max(1));
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let config = SyncConfig::default();
        let settings = SchedulerSettings::from(&config);
        assert_eq!(settings.interval_ms, 30_000);
        assert!(settings.enabled);
    }

    #[test]
    fn test_settings_track_disabled_auto_sync() {
        let config = SyncConfig {
            auto_sync_enabled: false,
            sync_interval_ms: 5_000,
            ..Default::default()
        };
        let settings = SchedulerSettings::from(&config);
        assert_eq!(settings.interval_ms, 5_000);
        assert!(!settings.enabled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_build_timer_first_tick_after_one_period() {
        let mut timer = build_timer(1_000);

        let early = tokio::time::timeout(Duration::from_millis(500), timer.tick()).await;
        assert!(early.is_err(), "timer must not fire before one period");

        let on_time = tokio::time::timeout(Duration::from_millis(600), timer.tick()).await;
        assert!(on_time.is_ok(), "timer must fire after one period");
    }
}
