use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Typed configuration, loaded from the environment (plus an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    /// Results page to poll.
    pub results_url: String,
    /// File holding the last notified row key.
    pub state_file: PathBuf,
    /// Delay between check cycles in loop mode.
    pub check_interval: Duration,
    /// Per-request HTTP timeout, bounding each blocking call.
    pub http_timeout: Duration,
    /// User-Agent sent with the results page GET.
    pub user_agent: String,

    // Telegram credentials. Optional at load time: a missing credential fails
    // the send attempt with a config error, never the poll loop.
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,

    /// Case-insensitive substring the course cell must contain before a
    /// changed row is notified. Empty disables the filter.
    pub course_filter: String,
    /// Surface fetch/parse failures to the chat as well (best-effort).
    pub notify_fetch_failures: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let results_url = env_str("JNTUK_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| "https://jntukresults.edu.in/".to_string());

        let state_file =
            env_path("LAST_FILE").unwrap_or_else(|| PathBuf::from("last_result.txt"));

        let check_interval_secs = env_u64("CHECK_INTERVAL_SECONDS").unwrap_or(1800);
        if check_interval_secs == 0 {
            return Err(Error::Config(
                "CHECK_INTERVAL_SECONDS must be greater than zero".to_string(),
            ));
        }
        let check_interval = Duration::from_secs(check_interval_secs);

        let http_timeout_secs = env_u64("HTTP_TIMEOUT_SECONDS").unwrap_or(15);
        if http_timeout_secs == 0 {
            return Err(Error::Config(
                "HTTP_TIMEOUT_SECONDS must be greater than zero".to_string(),
            ));
        }
        let http_timeout = Duration::from_secs(http_timeout_secs);

        let user_agent = env_str("NOTIFIER_USER_AGENT")
            .and_then(non_empty)
            .unwrap_or_else(|| {
                "Mozilla/5.0 (compatible; JNTUK-Result-Notifier/1.0)".to_string()
            });

        let bot_token = env_str("BOT_TOKEN").and_then(non_empty);
        let chat_id = env_str("CHAT_ID").and_then(non_empty);

        let course_filter = env_str("COURSE_FILTER")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "BTECH".to_string());
        let notify_fetch_failures = env_bool("NOTIFY_FETCH_FAILURES").unwrap_or(false);

        Ok(Self {
            results_url,
            state_file,
            check_interval,
            http_timeout,
            user_agent,
            bot_token,
            chat_id,
            course_filter,
            notify_fetch_failures,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
