use parking_lot::Mutex;
/// Debugging and logging infrastructure for par-remote
///
/// Two entry points write to the same file:
/// - the `log` crate facade (`log::info!` etc.), routed here by [`init_log_bridge`]
/// - the category macros (`debug_info!`, `debug_log!`, ...) for high-volume
///   categories such as `"INPUT"` and `"VIEWPORT"`, gated by `DEBUG_LEVEL`:
///   0/unset = off, 1 = errors, 2 = info, 3 = debug, 4 = trace
///
/// All output goes to /tmp/par_remote_debug.log on Unix/macOS,
/// or %TEMP%\par_remote_debug.log on Windows.
use par_remote_config::LogLevel;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Debug level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Off = 0,
    Error = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl DebugLevel {
    fn from_env() -> Self {
        match std::env::var("DEBUG_LEVEL") {
            Ok(val) => match val.trim().parse::<u8>() {
                Ok(1) => DebugLevel::Error,
                Ok(2) => DebugLevel::Info,
                Ok(3) => DebugLevel::Debug,
                Ok(4) => DebugLevel::Trace,
                _ => DebugLevel::Off,
            },
            Err(_) => DebugLevel::Off,
        }
    }
}

/// Path of the debug log file
pub fn log_path() -> PathBuf {
    #[cfg(unix)]
    {
        PathBuf::from("/tmp/par_remote_debug.log")
    }
    #[cfg(not(unix))]
    {
        std::env::temp_dir().join("par_remote_debug.log")
    }
}

/// Global debug logger
struct DebugLogger {
    level: DebugLevel,
    file: Option<std::fs::File>,
}

impl DebugLogger {
    fn new() -> Self {
        Self {
            level: DebugLevel::from_env(),
            file: None,
        }
    }

    fn ensure_file(&mut self) {
        if self.file.is_some() {
            return;
        }
        // Silently skip if the log file can't be opened
        if let Ok(f) = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(log_path())
        {
            self.file = Some(f);
            self.write_raw(&format!(
                "\n{}\npar-remote debug session started at {}\n{}\n",
                "=".repeat(80),
                get_timestamp(),
                "=".repeat(80)
            ));
        }
    }

    fn write_raw(&mut self, msg: &str) {
        if let Some(ref mut file) = self.file {
            let _ = file.write_all(msg.as_bytes());
            let _ = file.flush();
        }
    }

    fn write_line(&mut self, level_str: &str, category: &str, msg: &str) {
        self.ensure_file();
        let line = format!("[{}] [{}] [{}] {}\n", get_timestamp(), level_str, category, msg);
        self.write_raw(&line);
    }

    fn log(&mut self, level: DebugLevel, category: &str, msg: &str) {
        if level <= self.level {
            let level_str = match level {
                DebugLevel::Error => "ERROR",
                DebugLevel::Info => "INFO ",
                DebugLevel::Debug => "DEBUG",
                DebugLevel::Trace => "TRACE",
                DebugLevel::Off => return,
            };
            self.write_line(level_str, category, msg);
        }
    }
}

static LOGGER: OnceLock<Mutex<DebugLogger>> = OnceLock::new();

fn get_logger() -> &'static Mutex<DebugLogger> {
    LOGGER.get_or_init(|| Mutex::new(DebugLogger::new()))
}

fn get_timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.6f")
        .to_string()
}

/// Check if debugging is enabled at given level
pub fn is_enabled(level: DebugLevel) -> bool {
    let logger = get_logger().lock();
    level <= logger.level
}

/// Log a message at specified level
pub fn log(level: DebugLevel, category: &str, msg: &str) {
    let mut logger = get_logger().lock();
    logger.log(level, category, msg);
}

/// Log formatted message
pub fn logf(level: DebugLevel, category: &str, args: fmt::Arguments) {
    if is_enabled(level) {
        log(level, category, &format!("{}", args));
    }
}

/// `log` facade implementation writing into the debug file
struct LogBridge {
    mirror_stderr: bool,
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level_str = match record.level() {
            log::Level::Error => "ERROR",
            log::Level::Warn => "WARN ",
            log::Level::Info => "INFO ",
            log::Level::Debug => "DEBUG",
            log::Level::Trace => "TRACE",
        };
        let msg = record.args().to_string();
        get_logger()
            .lock()
            .write_line(level_str, record.target(), &msg);
        if self.mirror_stderr {
            eprintln!("[{}] {}: {}", level_str.trim(), record.target(), msg);
        }
    }

    fn flush(&self) {}
}

static BRIDGE: OnceLock<LogBridge> = OnceLock::new();

/// Resolve the effective level: CLI flag, then `RUST_LOG`, then config.
pub fn resolve_level(cli: Option<LogLevel>, rust_log: Option<&str>, config: LogLevel) -> LogLevel {
    cli.or_else(|| rust_log.and_then(LogLevel::parse))
        .unwrap_or(config)
}

/// Install the `log` bridge.
///
/// Safe to call more than once; only the first call installs the logger,
/// later calls just update the max level.
pub fn init_log_bridge(cli: Option<LogLevel>, config: LogLevel) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let level = resolve_level(cli, rust_log.as_deref(), config);

    let bridge = BRIDGE.get_or_init(|| LogBridge {
        mirror_stderr: rust_log.is_some(),
    });
    // Already installed by an earlier call
    let _ = log::set_logger(bridge);
    log::set_max_level(level.to_level_filter());
}

// Convenience macros for logging
#[macro_export]
macro_rules! debug_error {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Error, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_info {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Info, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_log {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Debug, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_trace {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Trace, $category, format_args!($($arg)*))
    };
}
