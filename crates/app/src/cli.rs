use std::path::PathBuf;

use clap::{Parser, Subcommand};
use services::{AppConfig, Clock};
use tea_core::model::ActivityId;

#[derive(Parser, Debug)]
#[command(name = "teaplus")]
#[command(about = "Guided social-skills exercises in the terminal", long_about = None)]
#[command(version)]
pub struct Cli {
    /// SQLite database URL or file path
    #[arg(
        long,
        env = "TEAPLUS_DB_URL",
        default_value = "sqlite://teaplus.sqlite3",
        global = true
    )]
    pub db: String,

    /// Custom activity catalog (.toml or .json)
    #[arg(long, env = "TEAPLUS_CATALOG", global = true)]
    pub catalog: Option<PathBuf>,

    /// Do not narrate exercises
    #[arg(long, global = true)]
    pub no_narration: bool,

    /// Shuffle exercises and answer options
    #[arg(long, global = true)]
    pub shuffle: bool,

    /// Reset a run that takes longer than this many seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub time_limit: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List available activities
    List,
    /// Play one activity
    Play {
        #[arg(value_parser = parse_activity_id)]
        activity: ActivityId,
    },
    /// Show recent results for an activity
    History {
        #[arg(value_parser = parse_activity_id)]
        activity: ActivityId,

        #[arg(long, default_value = "10")]
        limit: u32,
    },
    /// Latest and best result per activity (default)
    Dashboard,
}

fn parse_activity_id(raw: &str) -> Result<ActivityId, tea_core::Error> {
    Ok(ActivityId::new(raw)?)
}

impl Cli {
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Dashboard)
    }

    #[must_use]
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            db_url: normalize_sqlite_url(&self.db),
            catalog_path: self.catalog.clone(),
            narration: !self.no_narration,
            shuffle: self.shuffle,
            time_limit_secs: self.time_limit.filter(|secs| *secs > 0),
            clock: Clock::system(),
        }
    }
}

fn is_in_memory(url: &str) -> bool {
    url == "sqlite::memory:" || url.contains("mode=memory")
}

/// Turn a bare path or relative `sqlite:` URL into an absolute `sqlite://` URL.
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if is_in_memory(trimmed) {
        return trimmed.to_owned();
    }

    let path_str = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

#[derive(Debug)]
pub struct InvalidDbUrl(pub String);

impl std::fmt::Display for InvalidDbUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid --db value: {}", self.0)
    }
}

impl std::error::Error for InvalidDbUrl {}

/// Create the database file (and parent dirs) so the first connect succeeds.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if is_in_memory(db_url) {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| InvalidDbUrl(db_url.to_owned()))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(InvalidDbUrl(db_url.to_owned()).into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_dashboard() {
        let cli = Cli::try_parse_from(["teaplus"]).unwrap();
        assert_eq!(cli.command(), Command::Dashboard);
        let config = cli.app_config();
        assert!(config.narration);
        assert!(config.db_url.starts_with("sqlite:///"));
        assert!(config.db_url.ends_with("teaplus.sqlite3"));
    }

    #[test]
    fn parses_play_with_global_flags() {
        let cli = Cli::try_parse_from([
            "teaplus",
            "play",
            "emotion-faces",
            "--shuffle",
            "--no-narration",
            "--time-limit",
            "90",
        ])
        .unwrap();
        assert_eq!(
            cli.command(),
            Command::Play {
                activity: ActivityId::new("emotion-faces").unwrap()
            }
        );
        let config = cli.app_config();
        assert!(config.shuffle);
        assert!(!config.narration);
        assert_eq!(config.time_limit_secs, Some(90));
    }

    #[test]
    fn rejects_blank_activity() {
        assert!(Cli::try_parse_from(["teaplus", "play", "  "]).is_err());
    }

    #[test]
    fn zero_time_limit_means_none() {
        let cli = Cli::try_parse_from(["teaplus", "--time-limit", "0", "list"]).unwrap();
        assert_eq!(cli.app_config().time_limit_secs, None);
    }

    #[test]
    fn normalize_keeps_memory_and_absolutizes_paths() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/tea.db"),
            "sqlite:///tmp/tea.db"
        );
        assert_eq!(normalize_sqlite_url("/tmp/tea.db"), "sqlite:///tmp/tea.db");
        let relative = normalize_sqlite_url("sqlite:data/tea.db");
        assert!(relative.starts_with("sqlite:///"));
        assert!(relative.ends_with("data/tea.db"));
    }

    #[test]
    fn prepare_rejects_non_file_urls() {
        assert!(prepare_sqlite_file("sqlite::memory:").is_ok());
        assert!(prepare_sqlite_file("postgres://x").is_err());
        assert!(prepare_sqlite_file("sqlite://").is_err());
    }
}
