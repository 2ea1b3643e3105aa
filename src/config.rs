//! Configuration loading (spec §6.1, §4.13).
//!
//! Loaded from `agency.toml` plus environment overrides (`.env` via
//! `dotenvy` for local development). Every knob in §6.1's table has a
//! `default_*` function matching its documented default, so a bare
//! `agency.toml` carrying only `[database]` and `[tenancy]` still boots.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration, deserialized from `agency.toml`.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub jit: JitConfig,
    #[serde(default)]
    pub rate_ledger: RateLedgerConfig,
    #[serde(default)]
    pub reply_router: ReplyRouterConfig,
    #[serde(default)]
    pub patterns: PatternConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub test_mode: TestModeConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// SQLite connection settings.
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// Filesystem path to the SQLite database file.
    pub path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// Enrichment Waterfall tuning (spec §4.5, §6.1).
#[derive(Debug, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_clay_max_budget_percent")]
    pub clay_max_budget_percent: f64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            clay_max_budget_percent: default_clay_max_budget_percent(),
        }
    }
}

fn default_confidence_threshold() -> f64 {
    0.70
}

fn default_clay_max_budget_percent() -> f64 {
    0.15
}

/// Scorer tier boundaries and channel gates (spec §4.7, §6.1).
#[derive(Debug, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_hot_threshold")]
    pub hot_threshold: u32,
    #[serde(default = "default_warm_threshold")]
    pub warm_threshold: u32,
    #[serde(default = "default_voice_min_als")]
    pub voice_min_als: u32,
    #[serde(default = "default_mail_min_als")]
    pub mail_min_als: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            hot_threshold: default_hot_threshold(),
            warm_threshold: default_warm_threshold(),
            voice_min_als: default_voice_min_als(),
            mail_min_als: default_mail_min_als(),
        }
    }
}

fn default_hot_threshold() -> u32 {
    85
}

fn default_warm_threshold() -> u32 {
    60
}

fn default_voice_min_als() -> u32 {
    70
}

fn default_mail_min_als() -> u32 {
    85
}

/// JIT validator cooldown/warmup gates (spec §4.8, §6.1).
#[derive(Debug, Deserialize)]
pub struct JitConfig {
    #[serde(default = "default_min_touch_gap_days")]
    pub min_touch_gap_days: i64,
    #[serde(default = "default_channel_cooldown_days")]
    pub channel_cooldown_days: i64,
    #[serde(default = "default_email_warmup_days")]
    pub email_warmup_days: i64,
}

impl Default for JitConfig {
    fn default() -> Self {
        Self {
            min_touch_gap_days: default_min_touch_gap_days(),
            channel_cooldown_days: default_channel_cooldown_days(),
            email_warmup_days: default_email_warmup_days(),
        }
    }
}

fn default_min_touch_gap_days() -> i64 {
    2
}

fn default_channel_cooldown_days() -> i64 {
    5
}

fn default_email_warmup_days() -> i64 {
    14
}

/// Per-resource-type daily caps (spec §4.2, §6.1).
#[derive(Debug, Deserialize)]
pub struct RateLedgerConfig {
    #[serde(default = "default_daily_cap_email_domain")]
    pub daily_cap_email_domain: u32,
    #[serde(default = "default_daily_cap_sms_number")]
    pub daily_cap_sms_number: u32,
    #[serde(default = "default_daily_cap_voice_number")]
    pub daily_cap_voice_number: u32,
    #[serde(default = "default_daily_cap_linkedin_seat")]
    pub daily_cap_linkedin_seat: u32,
}

impl Default for RateLedgerConfig {
    fn default() -> Self {
        Self {
            daily_cap_email_domain: default_daily_cap_email_domain(),
            daily_cap_sms_number: default_daily_cap_sms_number(),
            daily_cap_voice_number: default_daily_cap_voice_number(),
            daily_cap_linkedin_seat: default_daily_cap_linkedin_seat(),
        }
    }
}

fn default_daily_cap_email_domain() -> u32 {
    50
}

fn default_daily_cap_sms_number() -> u32 {
    100
}

fn default_daily_cap_voice_number() -> u32 {
    50
}

fn default_daily_cap_linkedin_seat() -> u32 {
    17
}

/// Reply Router cost controls (spec §4.10, §6.1).
#[derive(Debug, Deserialize)]
pub struct ReplyRouterConfig {
    #[serde(default = "default_reply_lifetime_cap_usd")]
    pub reply_sdk_lifetime_cap_usd: f64,
}

impl Default for ReplyRouterConfig {
    fn default() -> Self {
        Self { reply_sdk_lifetime_cap_usd: default_reply_lifetime_cap_usd() }
    }
}

fn default_reply_lifetime_cap_usd() -> f64 {
    0.50
}

/// Pattern Detector eligibility gates (spec §4.11, §6.1).
#[derive(Debug, Deserialize)]
pub struct PatternConfig {
    #[serde(default = "default_pattern_min_conversions")]
    pub min_conversions: u32,
    #[serde(default = "default_pattern_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_pattern_min_sample")]
    pub min_sample: u32,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            min_conversions: default_pattern_min_conversions(),
            min_confidence: default_pattern_min_confidence(),
            min_sample: default_pattern_min_sample(),
        }
    }
}

fn default_pattern_min_conversions() -> u32 {
    20
}

fn default_pattern_min_confidence() -> f64 {
    0.70
}

fn default_pattern_min_sample() -> u32 {
    30
}

/// Cache Layer versioning (spec §4.3, §6.1).
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_version_prefix")]
    pub version_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { version_prefix: default_cache_version_prefix() }
    }
}

fn default_cache_version_prefix() -> String {
    "v1".to_owned()
}

/// Global test-mode defaults (spec §4.12, §6.1); runtime toggling happens via
/// `agency-osd admin toggle-test-mode` against [`crate::channels::test_mode::TestModeState`].
#[derive(Debug, Deserialize)]
pub struct TestModeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_test_daily_email_limit")]
    pub daily_email_limit: u32,
    #[serde(default)]
    pub operator_email: Option<String>,
    #[serde(default)]
    pub operator_phone: Option<String>,
}

impl Default for TestModeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            daily_email_limit: default_test_daily_email_limit(),
            operator_email: None,
            operator_phone: None,
        }
    }
}

fn default_test_daily_email_limit() -> u32 {
    15
}

/// Outreach Scheduler batching and concurrency (spec §4.9, §5, §6.1).
#[derive(Debug, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_scheduler_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_scheduler_max_parallel")]
    pub max_parallel: usize,
    #[serde(default = "default_scheduler_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_dispatch_deadline_secs")]
    pub dispatch_deadline_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_scheduler_batch_size(),
            max_parallel: default_scheduler_max_parallel(),
            interval_secs: default_scheduler_interval_secs(),
            dispatch_deadline_secs: default_dispatch_deadline_secs(),
        }
    }
}

fn default_scheduler_batch_size() -> u32 {
    50
}

fn default_scheduler_max_parallel() -> usize {
    10
}

fn default_scheduler_interval_secs() -> u64 {
    3600
}

fn default_dispatch_deadline_secs() -> u64 {
    60
}

/// Logging sink settings (spec §4.14).
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { logs_dir: default_logs_dir() }
    }
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("./logs")
}

impl Config {
    /// Loads configuration from a TOML file at `path`, applying `.env`
    /// overrides first via `dotenvy` (spec §4.13).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails to parse.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_parses_with_defaults() {
        let raw = r#"
            [database]
            path = "agency.db"
        "#;
        let config: Config = toml::from_str(raw).expect("minimal config parses");
        assert_eq!(config.enrichment.confidence_threshold, 0.70);
        assert_eq!(config.scoring.hot_threshold, 85);
        assert_eq!(config.rate_ledger.daily_cap_email_domain, 50);
    }
}
