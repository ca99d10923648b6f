use log::{LevelFilter, Log, Metadata, Record};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

/// Oldest held-back lines are dropped past this
const MAX_BUFFERED: usize = 1000;

static LOGGER: OnceLock<TuiLogger> = OnceLock::new();

/// Forwards records to `pretty_env_logger` (`RUST_LOG`, `info` by default).
/// While the terminal is in raw/alternate-screen mode records are held back
/// and written to stderr once it is restored.
pub struct TuiLogger {
    inner: Box<dyn Log>,
    suspended: AtomicBool,
    buffer: Mutex<VecDeque<String>>,
}

impl TuiLogger {
    fn new(inner: Box<dyn Log>) -> Self {
        Self {
            inner,
            suspended: AtomicBool::new(false),
            buffer: Mutex::new(VecDeque::new()),
        }
    }

    fn suspend(&self) {
        self.suspended.store(true, Ordering::SeqCst);
    }

    /// Stop holding records back and hand over what was held
    fn resume(&self) -> Vec<String> {
        self.suspended.store(false, Ordering::SeqCst);
        match self.buffer.lock() {
            Ok(mut buf) => buf.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn format_record(record: &Record) -> String {
    format!(
        " {:<5} {} > {}",
        record.level(),
        record.target(),
        record.args()
    )
}

impl Log for TuiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.inner.enabled(record.metadata()) {
            return;
        }
        if !self.suspended.load(Ordering::SeqCst) {
            self.inner.log(record);
            return;
        }
        if let Ok(mut buf) = self.buffer.lock() {
            if buf.len() >= MAX_BUFFERED {
                buf.pop_front();
            }
            buf.push_back(format_record(record));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the global logger. Safe to call more than once.
pub fn init() {
    let logger = pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    let tui = LOGGER.get_or_init(|| TuiLogger::new(Box::new(logger)));
    if log::set_logger(tui).is_ok() {
        log::set_max_level(level);
    }
}

/// Hold log output back while the UI owns the terminal
pub fn suspend() {
    if let Some(logger) = LOGGER.get() {
        logger.suspend();
    }
}

/// Write held-back output to stderr and log directly again
pub fn resume() {
    if let Some(logger) = LOGGER.get() {
        for line in logger.resume() {
            eprintln!("{line}");
        }
    }
}
