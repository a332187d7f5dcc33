//! Centralized logging configuration for the emulator.
//!
//! Every component logs through [`log`], which checks a per-category level
//! (falling back to a global level), applies a per-category rate limit and
//! only then formats the message. Output goes to stderr, or to a file through
//! a background writer thread.
//!
//! # Usage
//!
//! ```rust
//! use emu_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::Dsp, LogLevel::Debug, || {
//!     format!("SSP: reserved opcode at PC={:04X}", 0x0400)
//! });
//! ```

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse log level from string (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

/// Log category for the emulated components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// SSP1601 instruction execution, faults, stack wrap
    Dsp,
    /// Host-side register ports and mount operations
    Bus,
    /// Word RAM mode changes and denied accesses
    WordRam,
    /// Unimplemented features/stubs
    Stubs,
}

const CATEGORY_COUNT: usize = 4;

impl LogCategory {
    /// Every category, in index order
    pub const ALL: [LogCategory; CATEGORY_COUNT] = [
        LogCategory::Dsp,
        LogCategory::Bus,
        LogCategory::WordRam,
        LogCategory::Stubs,
    ];

    /// Parse a category name as used on the command line
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dsp" | "ssp" => Some(LogCategory::Dsp),
            "bus" => Some(LogCategory::Bus),
            "wordram" | "word_ram" | "wram" => Some(LogCategory::WordRam),
            "stubs" | "stub" => Some(LogCategory::Stubs),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            LogCategory::Dsp => 0,
            LogCategory::Bus => 1,
            LogCategory::WordRam => 2,
            LogCategory::Stubs => 3,
        }
    }
}

/// Sliding-window state for one category
#[derive(Default)]
struct Window {
    timestamps: VecDeque<Instant>,
    dropped: usize,
}

/// Per-category limit on log output frequency
struct RateLimiter {
    max_logs_per_second: AtomicUsize,
    window_duration: Duration,
    windows: Mutex<[Window; CATEGORY_COUNT]>,
}

impl RateLimiter {
    fn new(max_logs_per_second: usize) -> Self {
        Self {
            max_logs_per_second: AtomicUsize::new(max_logs_per_second),
            window_duration: Duration::from_secs(1),
            windows: Mutex::new(Default::default()),
        }
    }

    fn set_max_logs_per_second(&self, max: usize) {
        self.max_logs_per_second.store(max, Ordering::Relaxed);
    }

    fn get_max_logs_per_second(&self) -> usize {
        self.max_logs_per_second.load(Ordering::Relaxed)
    }

    /// Returns (allowed, dropped). `dropped` is the number of messages
    /// suppressed since the last one that got through.
    fn should_allow(&self, category: LogCategory) -> (bool, Option<usize>) {
        let max_logs = self.get_max_logs_per_second();
        if max_logs == 0 {
            return (true, None);
        }
        let now = Instant::now();
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let window = &mut windows[category.index()];

        while let Some(&front) = window.timestamps.front() {
            if now.duration_since(front) > self.window_duration {
                window.timestamps.pop_front();
            } else {
                break;
            }
        }

        if window.timestamps.len() < max_logs {
            window.timestamps.push_back(now);
            let dropped = std::mem::take(&mut window.dropped);
            (true, (dropped > 0).then_some(dropped))
        } else {
            window.dropped += 1;
            (false, None)
        }
    }
}

/// Global logging configuration
pub struct LogConfig {
    /// Global log level (applies to all categories unless overridden)
    global_level: AtomicU8,
    /// Category overrides, indexed by `LogCategory::index`
    category_levels: [AtomicU8; CATEGORY_COUNT],
    /// Channel to the background file writer
    log_sender: Mutex<Option<Sender<String>>>,
    file_logging_enabled: AtomicBool,
    rate_limiter: RateLimiter,
}

impl LogConfig {
    /// Create a LogConfig with all logging disabled and a 60 logs/second limit
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            category_levels: Default::default(),
            log_sender: Mutex::new(None),
            file_logging_enabled: AtomicBool::new(false),
            rate_limiter: RateLimiter::new(60),
        }
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    /// Set log level for a specific category
    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    /// Get log level for a specific category
    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed))
    }

    /// A category with its own level uses it; otherwise the global level applies.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Reset all logging to Off
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }

    /// Set the maximum logs per second per category
    pub fn set_rate_limit(&self, max_logs_per_second: usize) {
        self.rate_limiter
            .set_max_logs_per_second(max_logs_per_second);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.rate_limiter.get_max_logs_per_second()
    }

    /// Route log output to a file.
    ///
    /// Starts a background writer thread; a previous writer stops once its
    /// sender is replaced.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                let mut file = file;
                while let Ok(message) = receiver.recv() {
                    let _ = writeln!(file, "{}", message);
                    let _ = file.flush();
                }
                let _ = file.flush();
            })?;

        if let Ok(mut log_sender) = self.log_sender.lock() {
            *log_sender = Some(sender);
        }
        self.file_logging_enabled.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Stop logging to file and fall back to stderr
    pub fn clear_log_file(&self) {
        if let Ok(mut log_sender) = self.log_sender.lock() {
            *log_sender = None;
        }
        self.file_logging_enabled.store(false, Ordering::Relaxed);
    }

    fn write_message(&self, message: &str) {
        if self.file_logging_enabled.load(Ordering::Relaxed) {
            if let Ok(log_sender) = self.log_sender.lock() {
                if let Some(sender) = log_sender.as_ref() {
                    if sender.send(message.to_string()).is_ok() {
                        return;
                    }
                }
            }
        }
        eprintln!("{}", message);
    }
}

/// Log a message with the specified category and level.
///
/// The closure only runs when the category/level is enabled and the rate
/// limiter lets the message through.
///
/// ```rust
/// use emu_core::logging::{log, LogCategory, LogLevel};
///
/// log(LogCategory::WordRam, LogLevel::Info, || {
///     "word RAM: mode FullMain -> Split".to_string()
/// });
/// ```
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }

    let (allowed, dropped) = config.rate_limiter.should_allow(category);
    if let Some(count) = dropped {
        config.write_message(&format!("[{:?}] {} message(s) rate limited", category, count));
    }
    if allowed {
        config.write_message(&message_fn());
    }
}
