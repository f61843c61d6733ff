use clap::Parser;
use services::{AppServices, SessionSummaryListItem};
use tracing::info;

mod cli;
mod play;
mod telemetry;

use cli::{Cli, Command, prepare_sqlite_file};
use play::PlayOutcome;

fn format_result(item: &SessionSummaryListItem) -> String {
    format!(
        "{}  {:>3}/{:<3} ({}/{} correct)",
        item.completed_at.format("%Y-%m-%d %H:%M"),
        item.score,
        item.max_score,
        item.correct,
        item.total
    )
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.app_config();

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&config.db_url)?;
    let services = AppServices::new_sqlite(&config).await?;
    info!(db = %config.db_url, activities = services.catalog().len(), "teaplus ready");

    let catalog = services.catalog();
    match cli.command() {
        Command::List => {
            for activity in catalog.iter() {
                println!(
                    "{:<20} {} ({} exercises)",
                    activity.id(),
                    activity.title(),
                    activity.len()
                );
            }
        }
        Command::Play { activity } => {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let mut out = std::io::stdout();
            let outcome =
                play::play(&services.session_loop(), &activity, &mut input, &mut out).await?;
            if let PlayOutcome::Finished { score, max_score } = outcome {
                info!(%activity, score, max_score, "activity finished");
            }
        }
        Command::History { activity, limit } => {
            let items = services
                .session_summaries()
                .recent_for_activity(&activity, limit)
                .await?;
            if items.is_empty() {
                println!("No results for {activity} yet.");
            }
            for item in &items {
                println!("{}", format_result(item));
            }
        }
        Command::Dashboard => {
            let entries = services.session_summaries().dashboard(&catalog).await?;
            for entry in entries {
                let latest = entry
                    .latest
                    .as_ref()
                    .map_or_else(|| "not played yet".to_owned(), format_result);
                let best = entry
                    .best_score
                    .map_or_else(String::new, |best| format!("  best {best}/{}", entry.max_score));
                println!("{:<20} {}{}", entry.title, latest, best);
            }
        }
    }

    services.narration().shutdown();
    Ok(())
}

#[tokio::main]
async fn main() {
    telemetry::init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
