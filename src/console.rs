//! Console [`Reporter`]: prefixed status notices, dot ticks and per-bucket
//! completion lines.

use std::io::Write;
use std::sync::Mutex;

use crossterm::style::Stylize;
use crossterm::tty::IsTty;

use crate::contract::Reporter;

/// Prefix of every status notice.
pub const CLI_PREFIX: &str = "SyncS3Buckets: ";

pub struct ConsoleReporter {
    out: Mutex<Box<dyn Write + Send>>,
    color: bool,
}

impl ConsoleReporter {
    pub fn new(out: Box<dyn Write + Send>, color: bool) -> Self {
        Self {
            out: Mutex::new(out),
            color,
        }
    }

    /// Reporter on stdout, coloured when stdout is a terminal.
    pub fn stdout() -> Self {
        let color = std::io::stdout().is_tty();
        Self::new(Box::new(std::io::stdout()), color)
    }

    fn highlight(&self, text: &str) -> String {
        if self.color {
            text.yellow().to_string()
        } else {
            text.to_string()
        }
    }

    fn write(&self, text: &str) {
        // console output is best effort; a closed stdout must not fail the run
        if let Ok(mut out) = self.out.lock() {
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
        }
    }
}

impl Reporter for ConsoleReporter {
    fn notice(&self, message: &str) {
        self.write(&format!("{CLI_PREFIX}{}\n", self.highlight(message)));
    }

    fn tick(&self) {
        self.write(".");
    }

    fn target_completed(&self, bucket: &str, prefix: &str) {
        self.write(&format!(". s3://{bucket}/{prefix}\n"));
    }

    fn line(&self, label: &str, detail: &str) {
        self.write(&format!("{}{detail}\n", self.highlight(label)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn plain_output_layout() {
        let captured = Captured::default();
        let reporter = ConsoleReporter::new(Box::new(captured.clone()), false);

        reporter.notice("Syncing content to s3 buckets...");
        reporter.tick();
        reporter.tick();
        reporter.target_completed("b1", "assets/");
        reporter.line("s3 buckets:", "");
        reporter.line("  AssetsBucket", " : site-dev-assets");

        assert_eq!(
            captured.text(),
            "SyncS3Buckets: Syncing content to s3 buckets...\n... s3://b1/assets/\ns3 buckets:\n  AssetsBucket : site-dev-assets\n"
        );
    }

    #[test]
    fn coloured_notice_keeps_prefix_plain() {
        let captured = Captured::default();
        let reporter = ConsoleReporter::new(Box::new(captured.clone()), true);
        reporter.notice("All buckets completed!");

        let text = captured.text();
        assert!(text.starts_with(CLI_PREFIX));
        assert!(text.contains("All buckets completed!"));
        assert!(text.contains('\u{1b}'));
    }

    #[test]
    fn coloured_line_highlights_only_the_label() {
        let captured = Captured::default();
        let reporter = ConsoleReporter::new(Box::new(captured.clone()), true);
        reporter.line("  AssetsBucket", " : site-dev-assets");

        let text = captured.text();
        let label = "  AssetsBucket".yellow().to_string();
        assert_eq!(text, format!("{label} : site-dev-assets\n"));
    }
}
