//! `agency-osd` — the Agency OS binary (spec §4.16).
//!
//! `serve` runs the periodic Enrichment Flow, the Outreach Scheduler, the
//! Recovery Job, and the weekly Pattern Learning job as concurrent Tokio
//! tasks. `admin` issues one-shot operator commands against the shared
//! database (spec §6.5).

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use agency_os::channels::email::EmailDriver;
use agency_os::channels::linkedin::LinkedinDriver;
use agency_os::channels::mail::MailDriver;
use agency_os::channels::sms::SmsDriver;
use agency_os::channels::test_mode::TestModeState;
use agency_os::channels::voice::VoiceDriver;
use agency_os::channels::{ChannelDriver, ChannelKind};
use agency_os::config::Config;
use agency_os::engines::allocator::Allocator;
use agency_os::engines::cache::CacheLayer;
use agency_os::engines::enrichment::EnrichmentWaterfall;
use agency_os::engines::jit::{JitThresholds, JitValidator};
use agency_os::engines::rate_ledger::RateLedger;
use agency_os::engines::resource_pool::ResourcePool;
use agency_os::engines::suppression::SuppressionIndex;
use agency_os::orchestration::reply_router::{ReplyRouter, SdkReplyGenerator};
use agency_os::orchestration::scheduler::Scheduler;
use agency_os::orchestration::{allocation_job, enrichment_job, pattern_job, recovery};
use agency_os::providers::premium::PremiumProvider;
use agency_os::providers::primary::PrimaryProvider;
use agency_os::providers::supplement::SupplementProvider;
use agency_os::types::ids::TenantId;
use agency_os::{admin, db, logging};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "agency-osd", about = "Agency OS core dispatch subsystem")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "agency.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Runs the enrichment, scheduler, recovery, and pattern-learning loops.
    Serve,
    /// One-shot operator commands (spec §6.5).
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Pauses the scheduler globally.
    PauseScheduler,
    /// Resumes the scheduler globally.
    ResumeScheduler,
    /// Pauses a single tenant's outreach.
    PauseTenant {
        /// The tenant's id.
        tenant_id: String,
    },
    /// Resumes a single tenant's outreach.
    ResumeTenant {
        /// The tenant's id.
        tenant_id: String,
    },
    /// Clears every rate ledger bucket (emergency use).
    ResetRateLedger,
    /// Bumps the cache version prefix, invalidating all cached entries.
    BumpCacheVersion {
        /// The new version prefix, e.g. `"v2"`.
        prefix: String,
    },
    /// Enables test mode (driver address redirect).
    EnableTestMode,
    /// Disables test mode.
    DisableTestMode,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    match cli.command {
        Command::Serve => serve(&cli.config).await,
        Command::Admin { action } => run_admin(&cli.config, action).await,
    }
}

async fn run_admin(config_path: &PathBuf, action: AdminAction) -> Result<()> {
    logging::init_cli();
    let config = Config::load(config_path).context("loading config")?;
    let db = db::connect(&config.database.path, config.database.max_connections).await?;

    match action {
        AdminAction::PauseScheduler => {
            admin::set_scheduler_paused(&db, true).await?;
            info!("scheduler paused");
        }
        AdminAction::ResumeScheduler => {
            admin::set_scheduler_paused(&db, false).await?;
            info!("scheduler resumed");
        }
        AdminAction::PauseTenant { tenant_id } => {
            let tenant_id = TenantId::from_str(&tenant_id).context("parsing tenant id")?;
            admin::set_tenant_paused(&db, tenant_id, true).await?;
            info!(%tenant_id, "tenant paused");
        }
        AdminAction::ResumeTenant { tenant_id } => {
            let tenant_id = TenantId::from_str(&tenant_id).context("parsing tenant id")?;
            admin::set_tenant_paused(&db, tenant_id, false).await?;
            info!(%tenant_id, "tenant resumed");
        }
        AdminAction::ResetRateLedger => {
            let cleared = admin::reset_rate_ledger(&db).await?;
            info!(cleared, "rate ledger reset");
        }
        AdminAction::BumpCacheVersion { prefix } => {
            admin::bump_cache_version(&db, &prefix).await?;
            info!(prefix, "cache version bumped");
        }
        AdminAction::EnableTestMode => {
            admin::set_test_mode(&db, true).await?;
            info!("test mode enabled");
        }
        AdminAction::DisableTestMode => {
            admin::set_test_mode(&db, false).await?;
            info!("test mode disabled");
        }
    }

    Ok(())
}

/// Holds every long-lived handle `serve`'s background loops share.
struct Runtime {
    db: SqlitePool,
    drivers: Arc<HashMap<ChannelKind, Arc<dyn ChannelDriver>>>,
    scheduler: Arc<Scheduler>,
    reply_router: Arc<ReplyRouter>,
    recovery: Arc<recovery::RecoveryJob>,
    enrichment: Arc<EnrichmentWaterfall>,
    allocator: Arc<Allocator>,
    config: Config,
}

async fn serve(config_path: &PathBuf) -> Result<()> {
    let config = Config::load(config_path).context("loading config")?;
    let _logging_guard =
        logging::init_production(&config.logging.logs_dir).context("initializing logging")?;
    info!("agency-osd starting");

    let runtime = build_runtime(config).await?;

    let scheduler_task = tokio::spawn(scheduler_loop(runtime.db.clone(), runtime.scheduler.clone(), runtime.config.scheduler.interval_secs));
    let recovery_task = tokio::spawn(recovery_loop(runtime.recovery.clone(), runtime.config.scheduler.interval_secs));
    let enrichment_task = tokio::spawn(enrichment_loop(
        runtime.db.clone(),
        runtime.enrichment.clone(),
        runtime.config.scheduler.batch_size,
        runtime.config.enrichment.clay_max_budget_percent,
        runtime.config.scheduler.interval_secs,
    ));
    let pattern_task = tokio::spawn(pattern_loop(runtime.db.clone(), runtime.config.patterns.min_sample));
    let allocation_task = tokio::spawn(allocation_loop(
        runtime.db.clone(),
        runtime.allocator.clone(),
        runtime.config.scheduler.interval_secs,
    ));

    let _ = tokio::try_join!(
        scheduler_task,
        recovery_task,
        enrichment_task,
        pattern_task,
        allocation_task
    )
    .context("a background loop panicked")?;

    Ok(())
}

async fn build_runtime(config: Config) -> Result<Runtime> {
    let db = db::connect(&config.database.path, config.database.max_connections).await?;
    let http = reqwest::Client::new();

    let test_mode_enabled = admin::read_setting(
        &db,
        admin::TEST_MODE_ENABLED_KEY,
        if config.test_mode.enabled { "true" } else { "false" },
    )
    .await?
        == "true";
    let test_mode = Arc::new(TestModeState::default());
    test_mode.set_enabled(test_mode_enabled);
    test_mode.set_daily_cap(config.test_mode.daily_email_limit);
    test_mode.set_operator_email(config.test_mode.operator_email.clone());
    test_mode.set_operator_phone(config.test_mode.operator_phone.clone());

    let suppression = SuppressionIndex::new(db.clone());
    let rate_ledger = RateLedger::new(db.clone());
    let resource_pool = ResourcePool::new(db.clone(), rate_ledger);

    let cache_version =
        admin::read_setting(&db, admin::CACHE_VERSION_KEY, &config.cache.version_prefix).await?;
    let cache = CacheLayer::new(db.clone(), cache_version);

    let primary = Arc::new(PrimaryProvider::new(
        http.clone(),
        "https://primary-enrichment.invalid".to_owned(),
    ));
    let supplement = Arc::new(SupplementProvider::new(
        http.clone(),
        "https://supplement-enrichment.invalid".to_owned(),
    ));
    let premium = Arc::new(PremiumProvider::new(
        http.clone(),
        "https://premium-enrichment.invalid".to_owned(),
    ));
    let enrichment = Arc::new(EnrichmentWaterfall::new(
        cache,
        primary,
        supplement,
        premium,
        config.enrichment.confidence_threshold,
    ));

    let drivers: HashMap<ChannelKind, Arc<dyn ChannelDriver>> = HashMap::from([
        (ChannelKind::Email, Arc::new(EmailDriver::new(http.clone(), test_mode.clone())) as Arc<dyn ChannelDriver>),
        (ChannelKind::Sms, Arc::new(SmsDriver::new(http.clone(), test_mode.clone())) as Arc<dyn ChannelDriver>),
        (ChannelKind::Voice, Arc::new(VoiceDriver::new(http.clone(), test_mode.clone())) as Arc<dyn ChannelDriver>),
        (ChannelKind::LinkedIn, Arc::new(LinkedinDriver::new(http.clone(), test_mode.clone())) as Arc<dyn ChannelDriver>),
        (ChannelKind::Mail, Arc::new(MailDriver::new(http.clone(), test_mode.clone())) as Arc<dyn ChannelDriver>),
    ]);
    let drivers = Arc::new(drivers);

    let thresholds = JitThresholds {
        min_touch_gap_days: config.jit.min_touch_gap_days,
        channel_cooldown_days: config.jit.channel_cooldown_days,
        email_warmup_days: config.jit.email_warmup_days,
        voice_min_als: config.scoring.voice_min_als,
        mail_min_als: config.scoring.mail_min_als,
    };
    let jit = JitValidator::new(db.clone(), suppression.clone(), resource_pool.clone(), thresholds);
    let scheduler = Arc::new(Scheduler::new(
        db.clone(),
        jit,
        (*drivers).clone(),
        resource_pool.clone(),
        config.scheduler.batch_size,
        config.scheduler.max_parallel,
    ));

    let allocator = Arc::new(Allocator::new(
        db.clone(),
        suppression.clone(),
        config.patterns.min_confidence,
        config.patterns.min_sample,
    ));

    let cheap_generator = Arc::new(SdkReplyGenerator::new(
        http.clone(),
        "https://reply-sdk.invalid/v1/cheap/generate".to_owned(),
        0.02,
    ));
    let expensive_generator = Arc::new(SdkReplyGenerator::new(
        http.clone(),
        "https://reply-sdk.invalid/v1/expensive/generate".to_owned(),
        0.35,
    ));
    let reply_router = Arc::new(ReplyRouter::new(
        db.clone(),
        suppression,
        resource_pool,
        (*drivers).clone(),
        cheap_generator,
        expensive_generator,
        config.reply_router.reply_sdk_lifetime_cap_usd,
    ));

    let recovery = Arc::new(recovery::RecoveryJob::new(db.clone(), drivers.clone(), reply_router.clone()));

    Ok(Runtime { db, drivers, scheduler, reply_router, recovery, enrichment, allocator, config })
}

async fn scheduler_loop(db: SqlitePool, scheduler: Arc<Scheduler>, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        ticker.tick().await;
        match admin::scheduler_paused(&db).await {
            Ok(true) => {
                info!("scheduler run skipped: paused by operator");
                continue;
            }
            Ok(false) => {}
            Err(err) => {
                error!(%err, "failed to read scheduler pause flag, running anyway");
            }
        }
        match scheduler.run_once(chrono::Utc::now()).await {
            Ok(counts) => info!(?counts, "scheduler run complete"),
            Err(err) => error!(%err, "scheduler run failed"),
        }
    }
}

async fn recovery_loop(recovery: Arc<recovery::RecoveryJob>, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        ticker.tick().await;
        match recovery.run_once(chrono::Utc::now()).await {
            Ok(counts) => info!(?counts, "recovery run complete"),
            Err(err) => error!(%err, "recovery run failed"),
        }
    }
}

async fn enrichment_loop(
    db: SqlitePool,
    waterfall: Arc<EnrichmentWaterfall>,
    batch_size: u32,
    batch_budget_percent: f64,
    interval_secs: u64,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        ticker.tick().await;
        match enrichment_job::run_once(&db, &waterfall, batch_size, batch_budget_percent).await {
            Ok(counts) => info!(?counts, "enrichment flow batch complete"),
            Err(err) => error!(%err, "enrichment flow batch failed"),
        }
    }
}

async fn pattern_loop(db: SqlitePool, min_sample: u32) {
    let schedule = match cron::Schedule::from_str("0 0 3 * * Sat *") {
        Ok(schedule) => schedule,
        Err(err) => {
            error!(%err, "invalid pattern learning cron schedule, loop disabled");
            return;
        }
    };

    loop {
        let now = chrono::Utc::now();
        let Some(next) = schedule.upcoming(chrono::Utc).find(|fire| *fire > now) else {
            warn!("pattern learning schedule produced no upcoming fire time, loop stopping");
            return;
        };
        let wait = (next - now).to_std().unwrap_or(Duration::from_secs(3600));
        tokio::time::sleep(wait).await;

        match pattern_job::run_once(&db, min_sample).await {
            Ok(persisted) => info!(persisted, "pattern learning job complete"),
            Err(err) => error!(%err, "pattern learning job failed"),
        }
    }
}

async fn allocation_loop(db: SqlitePool, allocator: Arc<Allocator>, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        ticker.tick().await;
        match allocation_job::run_once(&db, &allocator).await {
            Ok(counts) => info!(?counts, "allocation run complete"),
            Err(err) => error!(%err, "allocation run failed"),
        }
    }
}
