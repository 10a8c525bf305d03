//! Console and log-file output.
//!
//! Log records go to stderr and are appended to a log file. If the file
//! cannot be opened or written, output continues on the console alone.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use env_logger::{Env, Target};

/// Default log file, relative to the working directory
pub const DEFAULT_LOG_FILE: &str = "runtime.log";

/// Copies every write to the console and, while it stays writable, to a file
struct TeeWriter<C: Write> {
    console: C,
    file: Option<File>,
}

impl<C: Write> Write for TeeWriter<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.console.write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            if file.write_all(buf).is_err() {
                self.file = None;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            if file.flush().is_err() {
                self.file = None;
            }
        }
        self.console.flush()
    }
}

/// Single-line `outer: cause: root` rendering of an error report for log output
pub fn error_chain(report: &color_eyre::Report) -> String {
    format!("{:#}", report)
}

fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize the global logger.
///
/// `default_level` applies unless `RUST_LOG` is set. Pass `None` for
/// `log_file` to log to the console only.
pub fn init(default_level: &str, log_file: Option<&Path>) {
    let mut open_error = None;
    let file = log_file.and_then(|path| match open_log_file(path) {
        Ok(file) => Some(file),
        Err(e) => {
            open_error = Some((path, e));
            None
        }
    });

    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .target(Target::Pipe(Box::new(TeeWriter {
            console: io::stderr(),
            file,
        })))
        .init();

    if let Some((path, e)) = open_error {
        log::warn!(
            "Unable to access log file '{}': {}. Logging to console only.",
            path.display(),
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::eyre;
    use tempfile::tempdir;

    #[test]
    fn test_tee_writes_to_both_sinks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("runtime.log");

        let mut writer = TeeWriter {
            console: Vec::new(),
            file: Some(open_log_file(&path).unwrap()),
        };
        writeln!(writer, "first message").unwrap();
        writeln!(writer, "second message").unwrap();
        writer.flush().unwrap();

        assert_eq!(writer.console, b"first message\nsecond message\n");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "first message\nsecond message\n"
        );
    }

    #[test]
    fn test_log_file_is_appended() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("runtime.log");
        std::fs::write(&path, "earlier run\n").unwrap();

        let mut writer = TeeWriter {
            console: io::sink(),
            file: Some(open_log_file(&path).unwrap()),
        };
        writeln!(writer, "this run").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "earlier run\nthis run\n"
        );
    }

    #[test]
    fn test_console_only_without_file() {
        let mut writer = TeeWriter {
            console: Vec::new(),
            file: None,
        };
        writeln!(writer, "console only").unwrap();
        assert_eq!(writer.console, b"console only\n");

        assert!(open_log_file(Path::new("/nonexistent/dir/runtime.log")).is_err());
    }

    #[test]
    fn test_error_chain_is_plain_text() {
        let report =
            eyre!("neighbor index 9 out of range").wrap_err("Failed to parse graph file 'grid.graph'");

        let line = error_chain(&report);

        assert_eq!(
            line,
            "Failed to parse graph file 'grid.graph': neighbor index 9 out of range"
        );
        assert!(!line.contains('\u{1b}'));
        assert!(!line.contains('\n'));
    }
}
