use clap::Parser;
use dining_rec::utils::error::ErrorSeverity;
use dining_rec::utils::logger;
use dining_rec::{app, CliConfig, Command, RecError};
use serde::Serialize;

fn exit_with(e: &RecError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 依錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 2,
        ErrorSeverity::Medium => 3,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 4,
    };
    std::process::exit(exit_code);
}

fn print_json<T: Serialize>(value: &T) -> Result<(), RecError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose, None);
            exit_with(&e);
        }
    };

    let level = config.logging.level.as_deref();
    if config.logging.json {
        logger::init_json_logger(cli.verbose, level);
    } else {
        logger::init_cli_logger(cli.verbose, level);
    }

    tracing::info!("🚀 Starting dining-rec");
    tracing::debug!("Resolved config: {:?}", config);

    let outcome = match &cli.command {
        Command::Recommend { user, at, .. } => app::run_recommend(&config, user, at.as_deref())
            .await
            .map(|rendered| println!("{}", rendered)),
        Command::Ingest { menus, date } => app::run_ingest(&config, menus, date.as_deref())
            .await
            .and_then(|report| print_json(&report)),
        Command::Rate {
            user,
            dish,
            score,
            comment,
        } => app::run_rate(&config, user, *dish, *score, comment.clone())
            .await
            .and_then(|rating| print_json(&rating)),
        Command::RateBatch { user, file } => app::run_rate_batch(&config, user, file)
            .await
            .and_then(|ratings| print_json(&ratings)),
        Command::Menu { hall, date, period } => {
            app::run_menu(&config, *hall, date, period.as_deref())
                .await
                .and_then(|menu| print_json(&serde_json::json!({ "menu": menu })))
        }
        Command::Ratings { user, dish } => app::run_ratings(&config, user.as_deref(), *dish)
            .await
            .and_then(|ratings| print_json(&ratings)),
        Command::Dishes { search } => app::run_search_dishes(&config, search)
            .await
            .and_then(|dishes| print_json(&serde_json::json!({ "dishes": dishes }))),
        Command::Repair => app::run_repair(&config)
            .await
            .and_then(|changed| print_json(&serde_json::json!({ "repaired": changed }))),
    };

    if let Err(e) = outcome {
        exit_with(&e);
    }

    Ok(())
}
