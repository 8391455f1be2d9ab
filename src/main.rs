use clap::Parser;
use menu_watch::adapters::menu_page::make_client;
use menu_watch::core::scheduler::SchedulerState;
use menu_watch::core::CredentialProvider;
use menu_watch::utils::error::{ErrorSeverity, WatchError};
use menu_watch::utils::logger::{self, LogOptions};
use menu_watch::utils::validation::Validate;
use menu_watch::{
    ChainedProvider, CliConfig, GmailMailer, InteractiveProvider, MenuPageSource, Notifier,
    Scheduler, Settings, StoredTokenProvider, SystemClock, TokenStore, TokioSleeper, WatchEngine,
};

fn exit_code(e: &WatchError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(e: &WatchError) -> ! {
    tracing::error!(
        severity = "critical",
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    std::process::exit(exit_code(e).max(1));
}

fn credential_provider(
    config: &CliConfig,
    client: reqwest::Client,
) -> Box<dyn CredentialProvider> {
    let stored = StoredTokenProvider::new(TokenStore::new(config.token_path()), client.clone());
    if config.no_interactive {
        return Box::new(stored);
    }
    let interactive = InteractiveProvider::new(
        config.credentials_path(),
        TokenStore::new(config.token_path()),
        client,
    );
    Box::new(ChainedProvider::new(stored, interactive))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = CliConfig::parse();

    // 初始化日誌 (只在這裡設定一次)
    let log_file = config.log_file_path();
    let _log_guard = logger::init_cli_logger(LogOptions {
        verbose: config.verbose,
        json: config.json_logs,
        log_file: Some(&log_file),
    });

    tracing::info!("🚀 Menu watch started");
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.validate() {
        fail(&e);
    }

    let client = match make_client() {
        Ok(client) => client,
        Err(e) => fail(&e),
    };

    if config.authorize {
        let provider = InteractiveProvider::new(
            config.credentials_path(),
            TokenStore::new(config.token_path()),
            client,
        );
        if let Err(e) = provider.access_token().await {
            fail(&e);
        }
        println!("✅ Token saved to {}", config.token_path().display());
        return;
    }

    // 載入並驗證設定，失敗時在進入迴圈前結束
    let settings = match Settings::from_file(config.settings_path()).and_then(|s| {
        s.validate()?;
        Ok(s)
    }) {
        Ok(settings) => settings,
        Err(e) => fail(&e),
    };
    let recipient = match settings.recipient() {
        Ok(recipient) => recipient.trim().to_string(),
        Err(e) => fail(&e),
    };
    let schedule = match settings.schedule() {
        Ok(schedule) => schedule,
        Err(e) => fail(&e),
    };
    tracing::info!(
        "✅ Watching {} item(s) for {}",
        settings.checklist.len(),
        recipient
    );

    let source = MenuPageSource::new(client.clone(), settings.menu_url.clone());
    let mailer = GmailMailer::new(client.clone(), credential_provider(&config, client));
    let notifier = Notifier::new(mailer, recipient);
    let engine = match WatchEngine::new(source, settings.checklist_terms(), notifier) {
        Ok(engine) => engine,
        Err(e) => fail(&e),
    };

    let mut scheduler = Scheduler::new(
        engine,
        SystemClock,
        TokioSleeper,
        schedule,
        config.scheduler_options(),
    );

    if config.once {
        if scheduler.step().await == SchedulerState::FatalStopped {
            if let Some(e) = scheduler.fatal_error() {
                fail(e);
            }
        }
        tracing::info!("✅ Single check finished");
        return;
    }

    let err = scheduler.run().await;
    fail(&err);
}
