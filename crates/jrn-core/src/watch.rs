//! One check cycle: fetch, compare against the persisted key, notify, persist.

use std::sync::Arc;

use crate::{
    config::Config,
    domain::{ChatId, ResultRow},
    fetch::ResultsSource,
    formatting::{escape_html, truncate_text},
    messaging::MessagingPort,
    state::StateStore,
    Error, Result,
};

/// Keeps the message comfortably under Telegram's 4096-char limit.
const DETAILS_MAX_LEN: usize = 3500;
const FAILURE_NOTE_MAX_LEN: usize = 500;

/// What a single check cycle did. Loop mode logs it; tests assert on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Page could not be fetched or parsed; state untouched.
    FetchFailed,
    /// Top row had no usable data; state untouched.
    NoData,
    /// Top row matches the last notified key; nothing sent.
    Unchanged,
    /// Row changed but the course filter did not match. Deliberately not
    /// persisted: the next qualifying row must be compared against the last
    /// *notified* key, not the last seen one.
    FilteredOut,
    /// Send failed; key not persisted so the same change is retried next cycle.
    SendFailed,
    /// Message sent and key persisted.
    Notified,
}

pub struct ResultWatcher {
    cfg: Arc<Config>,
    source: Arc<dyn ResultsSource>,
    messenger: Arc<dyn MessagingPort>,
    store: StateStore,
}

impl ResultWatcher {
    pub fn new(
        cfg: Arc<Config>,
        source: Arc<dyn ResultsSource>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        let store = StateStore::new(cfg.state_file.clone());
        Self {
            cfg,
            source,
            messenger,
            store,
        }
    }

    /// Run one full check cycle.
    ///
    /// Errors are returned only for state-file I/O; fetch, parse, and send
    /// failures degrade to a logged outcome so the poll loop keeps running.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let row = match self.source.fetch_top_row().await {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("failed to fetch results page: {e}");
                if self.cfg.notify_fetch_failures {
                    self.notify_fetch_failure(&e).await;
                }
                return Ok(CycleOutcome::FetchFailed);
            }
        };

        if row.is_empty() {
            tracing::info!("skipping: could not get valid row data");
            return Ok(CycleOutcome::NoData);
        }

        let key = row.key();
        let last = self.store.load()?;
        if key == last {
            tracing::info!("no new result");
            return Ok(CycleOutcome::Unchanged);
        }

        if !course_matches(&self.cfg.course_filter, &row.course) {
            tracing::info!(course = %row.course, "top row changed but course does not match filter");
            return Ok(CycleOutcome::FilteredOut);
        }

        tracing::info!(publish_date = %row.publish_date, "new result detected, sending notification");
        let message = build_message(&row, &self.cfg.results_url);
        match self.messenger.send_html(&self.target_chat(), &message).await {
            Ok(_) => {
                self.store.save(&key)?;
                tracing::info!("saved new latest result");
                Ok(CycleOutcome::Notified)
            }
            Err(e) => {
                tracing::warn!("failed to send notification, will retry next cycle: {e}");
                Ok(CycleOutcome::SendFailed)
            }
        }
    }

    fn target_chat(&self) -> ChatId {
        ChatId(self.cfg.chat_id.clone().unwrap_or_default())
    }

    /// Best-effort operator notification; never touches state.
    async fn notify_fetch_failure(&self, err: &Error) {
        let note = truncate_text(&err.to_string(), FAILURE_NOTE_MAX_LEN);
        let msg = format!(
            "\u{26a0}\u{fe0f} <b>Results check failed</b>\n\n{}",
            escape_html(&note)
        );
        if let Err(e) = self.messenger.send_html(&self.target_chat(), &msg).await {
            tracing::warn!("failed to send fetch-failure notification: {e}");
        }
    }
}

/// Case-insensitive substring match on the course label; an empty filter
/// accepts everything. Punctuation is ignored so `BTECH` matches both
/// "BTECH" and "B.TECH" as the site spells it.
fn course_matches(filter: &str, course: &str) -> bool {
    if filter.is_empty() {
        return true;
    }
    normalize_course(course).contains(&normalize_course(filter))
}

fn normalize_course(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

fn build_message(row: &ResultRow, page_url: &str) -> String {
    let details = truncate_text(&row.details, DETAILS_MAX_LEN);
    format!(
        "\u{1f514} <b>New B.Tech Result Published</b>\n\n\
         \u{1f4c5} <b>Publish Date:</b> {}\n\
         \u{1f4d8} <b>Details:</b> {}\n\n\
         \u{1f517} <a href=\"{}\">Open results page</a>",
        escape_html(&row.publish_date),
        escape_html(&details),
        escape_html(page_url),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageId, MessageRef};
    use crate::messaging::MessagingCapabilities;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeSource {
        row: Mutex<Option<ResultRow>>,
    }

    impl FakeSource {
        fn with_row(row: ResultRow) -> Self {
            Self {
                row: Mutex::new(Some(row)),
            }
        }

        fn failing() -> Self {
            Self {
                row: Mutex::new(None),
            }
        }

        fn set_row(&self, row: ResultRow) {
            *self.row.lock().unwrap() = Some(row);
        }
    }

    #[async_trait]
    impl ResultsSource for FakeSource {
        async fn fetch_top_row(&self) -> Result<ResultRow> {
            match self.row.lock().unwrap().clone() {
                Some(row) => Ok(row),
                None => Err(Error::Parse("no table element found on page".to_string())),
            }
        }
    }

    #[derive(Default)]
    struct FakeMessenger {
        fail: AtomicBool,
        sends: Mutex<Vec<String>>,
    }

    impl FakeMessenger {
        fn set_fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        fn sent_html(&self) -> Vec<String> {
            self.sends.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                supports_html: true,
                max_message_len: 4096,
            }
        }

        async fn send_html(&self, chat_id: &ChatId, html: &str) -> Result<MessageRef> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::External("telegram error: 502".to_string()));
            }
            self.sends.lock().unwrap().push(html.to_string());
            Ok(MessageRef {
                chat_id: chat_id.clone(),
                message_id: MessageId(1),
            })
        }
    }

    fn tmp_state_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let pid = std::process::id();
        std::env::temp_dir().join(format!("{prefix}-{pid}-{ts}.txt"))
    }

    fn test_config(state_file: PathBuf) -> Arc<Config> {
        Arc::new(Config {
            results_url: "https://results.example/".to_string(),
            state_file,
            check_interval: Duration::from_secs(1),
            http_timeout: Duration::from_secs(1),
            user_agent: "test".to_string(),
            bot_token: Some("token".to_string()),
            chat_id: Some("42".to_string()),
            course_filter: "BTECH".to_string(),
            notify_fetch_failures: false,
        })
    }

    fn btech_row() -> ResultRow {
        ResultRow {
            publish_date: "12-05-2024".to_string(),
            course: "B.TECH".to_string(),
            details: "R19 3-2 Results".to_string(),
        }
    }

    fn watcher(
        cfg: Arc<Config>,
        source: Arc<FakeSource>,
        messenger: Arc<FakeMessenger>,
    ) -> ResultWatcher {
        ResultWatcher::new(cfg, source, messenger)
    }

    #[tokio::test]
    async fn first_run_notifies_and_persists_key() {
        let cfg = test_config(tmp_state_file("jrn-watch-first"));
        let source = Arc::new(FakeSource::with_row(btech_row()));
        let messenger = Arc::new(FakeMessenger::default());
        let w = watcher(cfg.clone(), source, messenger.clone());

        assert_eq!(w.run_cycle().await.unwrap(), CycleOutcome::Notified);

        let sent = messenger.sent_html();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("12-05-2024"));
        assert!(sent[0].contains("R19 3-2 Results"));
        assert!(sent[0].contains("https://results.example/"));

        let persisted = std::fs::read_to_string(&cfg.state_file).unwrap();
        assert_eq!(persisted, btech_row().key());
    }

    #[tokio::test]
    async fn identical_page_on_second_cycle_sends_nothing() {
        let cfg = test_config(tmp_state_file("jrn-watch-unchanged"));
        let source = Arc::new(FakeSource::with_row(btech_row()));
        let messenger = Arc::new(FakeMessenger::default());
        let w = watcher(cfg, source, messenger.clone());

        assert_eq!(w.run_cycle().await.unwrap(), CycleOutcome::Notified);
        assert_eq!(w.run_cycle().await.unwrap(), CycleOutcome::Unchanged);
        assert_eq!(messenger.sent_html().len(), 1);
    }

    #[tokio::test]
    async fn send_failure_keeps_state_and_retries_next_cycle() {
        let cfg = test_config(tmp_state_file("jrn-watch-sendfail"));
        let source = Arc::new(FakeSource::with_row(btech_row()));
        let messenger = Arc::new(FakeMessenger::default());
        messenger.set_fail(true);
        let w = watcher(cfg.clone(), source, messenger.clone());

        assert_eq!(w.run_cycle().await.unwrap(), CycleOutcome::SendFailed);
        assert!(!cfg.state_file.exists());

        // Telegram comes back: the same change is picked up again.
        messenger.set_fail(false);
        assert_eq!(w.run_cycle().await.unwrap(), CycleOutcome::Notified);
        assert_eq!(
            std::fs::read_to_string(&cfg.state_file).unwrap(),
            btech_row().key()
        );
    }

    #[tokio::test]
    async fn filtered_row_is_not_persisted() {
        let cfg = test_config(tmp_state_file("jrn-watch-filter"));
        let mba = ResultRow {
            publish_date: "10-05-2024".to_string(),
            course: "MBA".to_string(),
            details: "MBA 1-1 Results".to_string(),
        };
        let source = Arc::new(FakeSource::with_row(mba));
        let messenger = Arc::new(FakeMessenger::default());
        let w = watcher(cfg.clone(), source.clone(), messenger.clone());

        assert_eq!(w.run_cycle().await.unwrap(), CycleOutcome::FilteredOut);
        assert!(messenger.sent_html().is_empty());
        assert!(!cfg.state_file.exists());

        // A qualifying row later is still seen as new relative to the last
        // notified key.
        source.set_row(btech_row());
        assert_eq!(w.run_cycle().await.unwrap(), CycleOutcome::Notified);
    }

    #[tokio::test]
    async fn fetch_failure_skips_cycle_without_touching_state() {
        let cfg = test_config(tmp_state_file("jrn-watch-fetchfail"));
        let source = Arc::new(FakeSource::failing());
        let messenger = Arc::new(FakeMessenger::default());
        let w = watcher(cfg.clone(), source, messenger.clone());

        assert_eq!(w.run_cycle().await.unwrap(), CycleOutcome::FetchFailed);
        assert!(messenger.sent_html().is_empty());
        assert!(!cfg.state_file.exists());
    }

    #[tokio::test]
    async fn fetch_failure_notifies_operator_when_enabled() {
        let mut cfg = (*test_config(tmp_state_file("jrn-watch-fetchnote"))).clone();
        cfg.notify_fetch_failures = true;
        let cfg = Arc::new(cfg);

        let source = Arc::new(FakeSource::failing());
        let messenger = Arc::new(FakeMessenger::default());
        let w = watcher(cfg.clone(), source, messenger.clone());

        assert_eq!(w.run_cycle().await.unwrap(), CycleOutcome::FetchFailed);
        let sent = messenger.sent_html();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Results check failed"));
        assert!(!cfg.state_file.exists());
    }

    #[tokio::test]
    async fn empty_row_is_no_data_not_cleared_state() {
        let cfg = test_config(tmp_state_file("jrn-watch-empty"));
        let source = Arc::new(FakeSource::with_row(btech_row()));
        let messenger = Arc::new(FakeMessenger::default());
        let w = watcher(cfg.clone(), source.clone(), messenger.clone());

        assert_eq!(w.run_cycle().await.unwrap(), CycleOutcome::Notified);

        source.set_row(ResultRow::default());
        assert_eq!(w.run_cycle().await.unwrap(), CycleOutcome::NoData);
        assert_eq!(messenger.sent_html().len(), 1);
        assert_eq!(
            std::fs::read_to_string(&cfg.state_file).unwrap(),
            btech_row().key()
        );
    }

    #[test]
    fn course_filter_ignores_case_and_punctuation() {
        assert!(course_matches("BTECH", "B.TECH"));
        assert!(course_matches("btech", "BTECH"));
        assert!(course_matches("BTECH", "B.Tech 3-2 (R19)"));
        assert!(!course_matches("BTECH", "MBA"));
        assert!(course_matches("", "MBA"));
    }

    #[test]
    fn message_escapes_html_in_extracted_fields() {
        let row = ResultRow {
            publish_date: "12-05-2024".to_string(),
            course: "B.TECH".to_string(),
            details: "R19 <3-2> & more".to_string(),
        };
        let msg = build_message(&row, "https://results.example/");
        assert!(msg.contains("R19 &lt;3-2&gt; &amp; more"));
        assert!(!msg.contains("<3-2>"));
    }
}
