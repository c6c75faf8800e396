//! Newline-delimited JSON event log for webhook dispatches.
//!
//! One line per POST `/webhook`. The file rotates by size and older
//! generations can be gzip compressed. Write failures are counted and logged
//! but never surface to the webhook caller.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use flate2::write::GzEncoder;
use flate2::Compression;

/// Size-based rotating writer. Backups are `<path>.1` .. `<path>.<keep>`.
pub struct RotatingWriter {
    path: PathBuf,
    file: fs::File,
    max_bytes: Option<u64>,
    keep: usize,
    compress: bool,
}

impl RotatingWriter {
    pub fn open(
        path: &str,
        max_bytes: Option<u64>,
        keep: usize,
        compress: bool,
    ) -> std::io::Result<Self> {
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            path: PathBuf::from(path),
            file,
            max_bytes,
            keep,
            compress,
        })
    }

    pub fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        if let Some(limit) = self.max_bytes {
            if self.current_size().is_some_and(|len| len >= limit) {
                self.rotate()?;
            }
        }
        writeln!(self.file, "{}", line)
    }

    pub fn current_size(&self) -> Option<u64> {
        self.path.metadata().ok().map(|m| m.len())
    }

    fn backup_path(&self, idx: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}", idx));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> std::io::Result<()> {
        if self.keep > 0 {
            for idx in (1..self.keep).rev() {
                for suffix in ["", ".gz"] {
                    let mut from = self.backup_path(idx).into_os_string();
                    from.push(suffix);
                    let from = PathBuf::from(from);
                    if from.exists() {
                        let mut to = self.backup_path(idx + 1).into_os_string();
                        to.push(suffix);
                        fs::rename(&from, PathBuf::from(to))?;
                    }
                }
            }
            let first = self.backup_path(1);
            fs::rename(&self.path, &first)?;
            if self.compress {
                compress_file(&first)?;
            }
        }
        self.file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        Ok(())
    }
}

fn compress_file(path: &Path) -> std::io::Result<()> {
    let data = fs::read(path)?;
    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(&data)?;
    let buf = gz.finish()?;
    let mut gz_path = path.as_os_str().to_owned();
    gz_path.push(".gz");
    fs::write(PathBuf::from(gz_path), buf)?;
    fs::remove_file(path)
}

/// Summary fields mirrored to the tracing log when `LOG_STDOUT` is set.
pub struct DispatchLogFields<'a> {
    pub route: &'a str,
    pub outcome: &'a str,
    pub replies_sent: usize,
    pub latency_ms: u128,
}

#[derive(Clone)]
pub struct TelemetrySink {
    writer: Option<Arc<Mutex<RotatingWriter>>>,
    log_stdout: bool,
    log_sample_n: Option<u64>,
    log_sample_counter: Arc<AtomicU64>,
    lines_total: Arc<AtomicU64>,
    write_errors_total: Arc<AtomicU64>,
    log_file_size_bytes: Arc<AtomicU64>,
}

impl TelemetrySink {
    pub fn new(writer: Option<RotatingWriter>, log_stdout: bool, log_sample_n: Option<u64>) -> Self {
        Self {
            writer: writer.map(|w| Arc::new(Mutex::new(w))),
            log_stdout,
            log_sample_n,
            log_sample_counter: Arc::new(AtomicU64::new(0)),
            lines_total: Arc::new(AtomicU64::new(0)),
            write_errors_total: Arc::new(AtomicU64::new(0)),
            log_file_size_bytes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Sink with no file and no stdout mirror.
    pub fn disabled() -> Self {
        Self::new(None, false, None)
    }

    pub fn emit(&self, payload: &serde_json::Value, log: &DispatchLogFields<'_>) {
        let wrote = self.write_line(payload);
        if (wrote || self.writer.is_none()) && self.should_log_stdout() {
            tracing::info!(
                target: "telemetry",
                event = "dispatch",
                route = log.route,
                outcome = log.outcome,
                repliesSent = log.replies_sent,
                latencyMs = log.latency_ms
            );
        }
    }

    pub fn lines_total(&self) -> u64 {
        self.lines_total.load(Ordering::Relaxed)
    }

    pub fn write_errors_total(&self) -> u64 {
        self.write_errors_total.load(Ordering::Relaxed)
    }

    pub fn log_file_size_bytes(&self) -> u64 {
        self.log_file_size_bytes.load(Ordering::Relaxed)
    }

    fn write_line(&self, payload: &serde_json::Value) -> bool {
        let Some(target) = self.writer.as_ref() else {
            return false;
        };
        let line = payload.to_string();
        let Ok(mut guard) = target.lock() else {
            return false;
        };
        match guard.write_line(&line) {
            Ok(()) => {
                self.lines_total.fetch_add(1, Ordering::Relaxed);
                if let Some(sz) = guard.current_size() {
                    self.log_file_size_bytes.store(sz, Ordering::Relaxed);
                }
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to write telemetry line");
                self.write_errors_total.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    fn should_log_stdout(&self) -> bool {
        if !self.log_stdout {
            return false;
        }
        match self.log_sample_n {
            Some(n) if n > 1 => self.log_sample_counter.fetch_add(1, Ordering::Relaxed) % n == 0,
            _ => true,
        }
    }
}
