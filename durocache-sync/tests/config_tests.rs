use durocache_sync::{BackoffConfig, SYNC_INTERVAL, SchedulerConfig};
use pretty_assertions::assert_eq;
use std::time::Duration;

#[test]
fn default_interval_is_sixty_seconds() {
    let config = SchedulerConfig::default();
    assert_eq!(config.sync_interval(), Duration::from_secs(60));
    assert_eq!(config.sync_interval(), SYNC_INTERVAL);
    assert_eq!(config.max_batch_size, 0);
    assert!(config.backoff.is_none());
}

#[test]
fn retry_delay_without_backoff_is_constant() {
    let config = SchedulerConfig::default();
    for failures in 0..5 {
        assert_eq!(config.retry_delay_ms(failures), 60_000);
    }
}

#[test]
fn retry_delay_with_backoff_is_capped() {
    let config = SchedulerConfig {
        sync_interval_ms: 100,
        max_batch_size: 0,
        backoff: Some(BackoffConfig {
            multiplier: 3,
            max_delay_ms: 1_000,
        }),
    };
    assert_eq!(config.retry_delay_ms(0), 100);
    assert_eq!(config.retry_delay_ms(1), 300);
    assert_eq!(config.retry_delay_ms(2), 900);
    assert_eq!(config.retry_delay_ms(3), 1_000);
    assert_eq!(config.retry_delay_ms(u32::MAX), 1_000);
}

#[test]
fn backoff_cap_below_interval_never_shortens_delay() {
    let config = SchedulerConfig {
        sync_interval_ms: 1_000,
        max_batch_size: 0,
        backoff: Some(BackoffConfig {
            multiplier: 2,
            max_delay_ms: 10,
        }),
    };
    assert_eq!(config.retry_delay_ms(4), 1_000);
}

#[test]
fn partial_json_fills_defaults() {
    let config: SchedulerConfig = serde_json::from_str(r#"{"max_batch_size": 25}"#).unwrap();
    assert_eq!(config.max_batch_size, 25);
    assert_eq!(config.sync_interval_ms, 60_000);
}

#[test]
fn backoff_json_round_trips() {
    let config: SchedulerConfig =
        serde_json::from_str(r#"{"sync_interval_ms": 500, "backoff": {"multiplier": 4}}"#)
            .unwrap();
    assert_eq!(
        config.backoff,
        Some(BackoffConfig {
            multiplier: 4,
            max_delay_ms: 15 * 60 * 1000,
        })
    );
}
