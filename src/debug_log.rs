use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Rotate `session.log` once it grows past this many bytes.
const MAX_LOG_BYTES: u64 = 1024 * 1024;

lazy_static::lazy_static! {
    static ref LOG_MUTEX: parking_lot::Mutex<()> = parking_lot::Mutex::new(());
    static ref LOG_DIR: PathBuf = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("webview-autoheight")
        .join("logs");
}

pub fn log_dir() -> &'static Path {
    LOG_DIR.as_path()
}

pub fn log_debug(msg: &str) {
    let _lock = LOG_MUTEX.lock();
    let _ = std::fs::create_dir_all(log_dir());
    append_line(&log_dir().join("session.log"), msg);
}

/// Append one timestamped line, moving an oversized file aside to `*.old` first.
fn append_line(path: &Path, msg: &str) {
    if std::fs::metadata(path).is_ok_and(|m| m.len() > MAX_LOG_BYTES) {
        let _ = std::fs::rename(path, path.with_extension("old"));
    }
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let _ = writeln!(file, "[{}] {}", timestamp, msg);
    }
}

/// Print to stdout and append to the session log.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        println!("{}", msg);
        $crate::debug_log::log_debug(&msg);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_appended_with_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.log");
        append_line(&path, "first");
        append_line(&path, "second");

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('[') && lines[0].ends_with("] first"));
        assert!(lines[1].ends_with("] second"));
    }

    #[test]
    fn oversized_log_is_rotated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.log");
        std::fs::write(&path, vec![b'x'; MAX_LOG_BYTES as usize + 1]).unwrap();

        append_line(&path, "fresh");

        assert!(dir.path().join("session.old").exists());
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("] fresh\n"));
    }
}
