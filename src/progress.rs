//! Terminal progress bar for dataset downloads

use std::io::{self, Read, Write};

/// A byte-count progress bar redrawn in place on stdout
#[derive(Debug)]
pub struct ProgressBar {
    total: u64,
    current: u64,
    width: usize,
    label: String,
    enabled: bool,
    last_drawn: Option<u64>,
}

impl ProgressBar {
    /// `total` of 0 means the size is unknown; only the byte count is shown
    pub fn new(total: u64, label: impl Into<String>) -> Self {
        Self {
            total,
            current: 0,
            width: 40,
            label: label.into(),
            enabled: true,
            last_drawn: None,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn inc(&mut self, amount: u64) {
        self.current = if self.total > 0 {
            (self.current + amount).min(self.total)
        } else {
            self.current + amount
        };
        self.render(false);
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.current as f64 / self.total as f64) * 100.0
    }

    pub fn finish(&mut self) {
        if self.total > 0 {
            self.current = self.total;
        }
        self.render(true);
        if self.enabled {
            println!();
        }
    }

    fn render(&mut self, force: bool) {
        if !self.enabled {
            return;
        }
        // Redraw at most once per tenth of a percent / per MiB
        let bucket = if self.total > 0 {
            (self.percentage() * 10.0) as u64
        } else {
            self.current >> 20
        };
        if !force && self.last_drawn == Some(bucket) {
            return;
        }
        self.last_drawn = Some(bucket);

        let mib = self.current as f64 / (1024.0 * 1024.0);
        let line = if self.total > 0 {
            let filled = ((self.percentage() / 100.0) * self.width as f64) as usize;
            format!(
                "\r{} [{}{}] {:>5.1}% {:.1} MiB",
                self.label,
                "█".repeat(filled),
                "░".repeat(self.width - filled),
                self.percentage(),
                mib
            )
        } else {
            format!("\r{} {:.1} MiB", self.label, mib)
        };

        print!("{line}");
        let _ = io::stdout().flush();
    }
}

/// Reader adapter that advances a [`ProgressBar`] as bytes pass through
pub struct ProgressReader<R> {
    inner: R,
    bar: ProgressBar,
}

impl<R: Read> ProgressReader<R> {
    pub fn new(inner: R, bar: ProgressBar) -> Self {
        Self { inner, bar }
    }

    pub fn finish(mut self) {
        self.bar.finish();
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bar.inc(n as u64);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_clamps_to_total() {
        let mut bar = ProgressBar::new(100, "test").with_enabled(false);
        bar.inc(60);
        bar.inc(60);
        assert_eq!(bar.current(), 100);
        assert!((bar.percentage() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_total_counts_bytes() {
        let mut bar = ProgressBar::new(0, "test").with_enabled(false);
        bar.inc(1234);
        assert_eq!(bar.current(), 1234);
        assert_eq!(bar.percentage(), 0.0);
    }

    #[test]
    fn test_reader_passes_bytes_through() {
        let data = vec![7u8; 4096];
        let bar = ProgressBar::new(data.len() as u64, "copy").with_enabled(false);
        let mut reader = ProgressReader::new(&data[..], bar);

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();

        assert_eq!(out, data);
        assert_eq!(reader.bar.current(), 4096);
    }
}
