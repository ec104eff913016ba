use crate::utils::error::Result;
use chrono::{DateTime, Local};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{ChronoLocal, FormatTime};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_cli_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("fleet_booker=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fleet_booker=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

pub fn init_json_logger() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fleet_booker=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }

    fn from_tracing(level: &Level) -> Self {
        match *level {
            Level::ERROR => LogLevel::Error,
            Level::WARN => LogLevel::Warning,
            _ => LogLevel::Info,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

/// 執行日誌檔的行格式：`[%Y-%m-%d %H:%M:%S] LEVEL - 訊息`
struct RunLineFormat {
    timer: ChronoLocal,
}

impl RunLineFormat {
    fn new() -> Self {
        Self {
            timer: ChronoLocal::new("[%Y-%m-%d %H:%M:%S]".to_string()),
        }
    }
}

impl<S, N> FormatEvent<S, N> for RunLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        self.timer.format_time(&mut writer)?;
        let level = LogLevel::from_tracing(event.metadata().level());
        write!(writer, " {} - ", level.as_str())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// 單次預約執行的日誌
///
/// 由執行器建立並明確傳入流程，不使用任何全域狀態。每一行同時送往
/// 全域 `tracing`（附帶 `run_id`）、該次執行專屬的 `run-{run_id}.log`
/// （`tracing-appender`），並保留在記憶體中。
pub struct RunLog {
    run_id: String,
    path: Option<PathBuf>,
    file: Option<Dispatch>,
    entries: Mutex<Vec<LogEntry>>,
}

impl RunLog {
    /// 在 `logs_dir` 下開啟（附加模式）該次執行的日誌檔
    pub fn create<P: AsRef<Path>>(logs_dir: P, run_id: &str) -> Result<Self> {
        let file_name = format!("run-{}.log", run_id);
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(&file_name)
            .build(logs_dir.as_ref())
            .map_err(std::io::Error::other)?;

        let subscriber = tracing_subscriber::fmt()
            .with_writer(appender)
            .with_ansi(false)
            .event_format(RunLineFormat::new())
            .finish();

        Ok(Self {
            run_id: run_id.to_string(),
            path: Some(logs_dir.as_ref().join(file_name)),
            file: Some(Dispatch::new(subscriber)),
            entries: Mutex::new(Vec::new()),
        })
    }

    /// 不寫檔的日誌，只保留在記憶體
    pub fn in_memory(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            path: None,
            file: None,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&self, message: impl Into<String>) {
        self.record(LogLevel::Info, message.into());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.record(LogLevel::Warning, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.record(LogLevel::Error, message.into());
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// 指定等級的所有訊息
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level == level)
            .map(|entry| entry.message)
            .collect()
    }

    fn record(&self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => tracing::info!(run_id = %self.run_id, "{}", message),
            LogLevel::Warning => tracing::warn!(run_id = %self.run_id, "{}", message),
            LogLevel::Error => tracing::error!(run_id = %self.run_id, "{}", message),
        }

        if let Some(file) = &self.file {
            tracing::dispatcher::with_default(file, || match level {
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warning => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            });
        }

        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                timestamp: Local::now(),
                level,
                message,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_run_log_writes_formatted_lines() {
        let temp_dir = TempDir::new().unwrap();
        let log = RunLog::create(temp_dir.path().join("logs"), "20250612-101500").unwrap();

        log.info("Page loaded successfully");
        log.warn("Quantity field not found");

        let path = log.path().unwrap().to_path_buf();
        assert!(path.ends_with("run-20250612-101500.log"));

        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] INFO - Page loaded successfully"));
        assert!(lines[1].ends_with("] WARNING - Quantity field not found"));
    }

    #[test]
    fn test_run_log_appends_across_instances() {
        let temp_dir = TempDir::new().unwrap();

        RunLog::create(temp_dir.path(), "same-run").unwrap().info("attempt 1");
        RunLog::create(temp_dir.path(), "same-run").unwrap().info("attempt 2");

        let content = std::fs::read_to_string(temp_dir.path().join("run-same-run.log")).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_run_logs_stay_separate() {
        let temp_dir = TempDir::new().unwrap();
        let first = RunLog::create(temp_dir.path(), "first").unwrap();
        let second = RunLog::create(temp_dir.path(), "second").unwrap();

        first.info("only in first");
        second.error("only in second");

        let first_content = std::fs::read_to_string(first.path().unwrap()).unwrap();
        let second_content = std::fs::read_to_string(second.path().unwrap()).unwrap();
        assert!(first_content.contains("INFO - only in first"));
        assert!(!first_content.contains("only in second"));
        assert!(second_content.contains("ERROR - only in second"));
        assert_eq!(second_content.lines().count(), 1);
    }

    #[test]
    fn test_in_memory_messages_by_level() {
        let log = RunLog::in_memory("mem");
        log.info("a");
        log.error("b");
        log.warn("c");

        assert_eq!(log.messages(LogLevel::Error), vec!["b".to_string()]);
        assert_eq!(log.messages(LogLevel::Warning), vec!["c".to_string()]);
        assert_eq!(log.entries().len(), 3);
        assert!(log.path().is_none());
    }
}
