use clap::Parser;
use fleet_booker::adapters::http::{self, AppState};
use fleet_booker::config::cli::{Cli, Command};
use fleet_booker::core::runner::{run_timestamp, JobQueue};
use fleet_booker::domain::model::JobSubmission;
use fleet_booker::domain::ports::ServiceResolver;
use fleet_booker::utils::error::{BookingError, ErrorSeverity};
use fleet_booker::utils::logger;
use fleet_booker::utils::validation::Validate;
use fleet_booker::{
    AppConfig, BookingRequest, BrowserProfile, JobRunner, LocalStorage, ServiceTable,
    WebDriverFactory,
};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting fleet-booker");
    if cli.verbose {
        tracing::debug!("CLI arguments: {:?}", cli);
    }

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: Cli) -> Result<(), BookingError> {
    let config = AppConfig::from_file(&cli.config)?;
    config.validate()?;

    let table = ServiceTable::from_path(&config.mapping.file)?;
    tracing::info!("📋 Loaded {} mapping rows", table.len());

    match cli.command {
        Command::Resolve { ids } => {
            let services = table.resolve(&ids);
            if services.is_empty() {
                return Err(BookingError::Resolution { identifiers: ids });
            }
            for service in services {
                println!("{:<20} | {}", service.group, service.name);
            }
            Ok(())
        }
        Command::Run { job, browser } => {
            let content = std::fs::read_to_string(&job)?;
            let request: BookingRequest = serde_json::from_str(&content)?;
            let profile = match browser {
                Some(name) => name.parse::<BrowserProfile>()?,
                None => config.browser.default_profile,
            };

            let runner = build_runner(&config, table);
            let submission = JobSubmission {
                run_id: runner.registry().reserve(&run_timestamp()).await,
                request,
                profile,
            };

            let report = runner.execute(submission).await?;
            tracing::info!("✅ Booking {} completed", report.run_id);
            println!("✅ Booking completed after {} attempt(s)", report.attempts);
            println!("📁 Screenshot saved to: {}", report.screenshot_path);
            Ok(())
        }
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let runner = Arc::new(build_runner(&config, table));
            let state = AppState {
                jobs: Arc::new(runner) as Arc<dyn JobQueue>,
                default_profile: config.browser.default_profile,
            };
            http::serve(&bind, state).await?;
            Ok(())
        }
    }
}

fn build_runner(
    config: &AppConfig,
    table: ServiceTable,
) -> JobRunner<ServiceTable, WebDriverFactory, LocalStorage> {
    JobRunner::from_config(
        config,
        table,
        WebDriverFactory::new(config.browser.clone()),
        LocalStorage::new(config.output.screenshots_dir.clone()),
    )
}
