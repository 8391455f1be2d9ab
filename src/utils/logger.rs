use std::ffi::OsStr;
use std::path::Path;

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const TIMESTAMP_FORMAT: &str = "[%d.%m.%Y %H:%M:%S]";
const JSON_TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Log sinks chosen at process entry.
#[derive(Debug, Clone)]
pub struct LogOptions<'a> {
    pub verbose: bool,
    pub json: bool,
    pub log_file: Option<&'a Path>,
}

/// 初始化日誌: stdout + 檔案
///
/// Must be called once from `main`. The returned guard flushes the file
/// writer on drop, so keep it alive for the lifetime of the process.
pub fn init_cli_logger(options: LogOptions<'_>) -> Option<WorkerGuard> {
    let filter = if options.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("menu_watch=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("menu_watch=info"))
    };

    let stdout_layer = if options.json {
        tracing_subscriber::fmt::layer()
            .with_timer(ChronoLocal::new(JSON_TIMESTAMP_FORMAT.to_string()))
            .with_target(false)
            .json()
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .boxed()
    };

    let (file_layer, guard) = match options.log_file.and_then(split_log_path) {
        Some((dir, file_name)) => {
            let (layer, guard) = file_layer(dir, file_name);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

/// Plain-text sink appending to `dir/file_name` through a background writer.
pub fn file_layer<S>(dir: &Path, file_name: &OsStr) -> (Box<dyn Layer<S> + Send + Sync>, WorkerGuard)
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = tracing_subscriber::fmt::layer()
        .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .boxed();
    (layer, guard)
}

fn split_log_path(path: &Path) -> Option<(&Path, &OsStr)> {
    let file_name = path.file_name()?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Some((dir, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path_with_directory() {
        let (dir, name) = split_log_path(Path::new("/var/log/menu/bot.log")).unwrap();
        assert_eq!(dir, Path::new("/var/log/menu"));
        assert_eq!(name, "bot.log");
    }

    #[test]
    fn test_split_log_path_bare_file_uses_cwd() {
        let (dir, name) = split_log_path(Path::new("bot.log")).unwrap();
        assert_eq!(dir, Path::new("."));
        assert_eq!(name, "bot.log");
    }

    #[test]
    fn test_file_layer_writes_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let (layer, guard) = file_layer(dir.path(), OsStr::new("bot.log"));
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Sent message to 'jan@example.com'. Message Id: 18f1c2");
            tracing::error!("Bad URL: 'http://127.0.0.1:1/menu'");
        });
        drop(guard);

        let content = std::fs::read_to_string(dir.path().join("bot.log")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let pattern =
            regex::Regex::new(r"^\[\d{2}\.\d{2}\.\d{4} \d{2}:\d{2}:\d{2}\]\s+(INFO|ERROR) ").unwrap();
        assert!(lines.iter().all(|line| pattern.is_match(line)), "{}", content);
        assert!(lines[0].ends_with("INFO Sent message to 'jan@example.com'. Message Id: 18f1c2"));
        assert!(lines[1].contains("ERROR Bad URL"));
        assert!(!content.contains('\u{1b}'));
    }

    #[test]
    fn test_split_log_path_rejects_directory_only() {
        assert!(split_log_path(Path::new("/")).is_none());
    }
}
