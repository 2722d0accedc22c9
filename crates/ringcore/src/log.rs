//! Worker-tagged stderr logging: zero-dependency `printk`-style macros with
//! a single thread-local worker id tagged onto every line.
//!
//! # Environment variables
//!
//! - `RINGD_LOG_LEVEL` — `off`/`error`/`warn`/`info`/`debug`/`trace` or 0-5.
//!   Defaults to `info`.
//! - `RINGD_LOG_FLUSH` — if set to `1`/`true`, flushes stderr after every line.

use std::cell::Cell;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl Level {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Level::Off,
            1 => Level::Error,
            2 => Level::Warn,
            3 => Level::Info,
            4 => Level::Debug,
            _ => Level::Trace,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Level::Off => "",
            Level::Error => "[ERROR]",
            Level::Warn => "[WARN] ",
            Level::Info => "[INFO] ",
            Level::Debug => "[DEBUG]",
            Level::Trace => "[TRACE]",
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);
static FLUSH_ENABLED: AtomicBool = AtomicBool::new(false);
static INITIALIZED: AtomicBool = AtomicBool::new(false);

thread_local! {
    static WORKER_ID: Cell<Option<u32>> = const { Cell::new(None) };
}

/// Read `RINGD_LOG_LEVEL`/`RINGD_LOG_FLUSH` once. Safe to call repeatedly;
/// also runs lazily on first log call.
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    if let Ok(val) = std::env::var("RINGD_LOG_LEVEL") {
        let level = match val.to_lowercase().as_str() {
            "off" | "0" => Level::Off,
            "error" | "1" => Level::Error,
            "warn" | "2" => Level::Warn,
            "info" | "3" => Level::Info,
            "debug" | "4" => Level::Debug,
            "trace" | "5" => Level::Trace,
            _ => Level::Info,
        };
        LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    }
    let flush = std::env::var("RINGD_LOG_FLUSH")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    FLUSH_ENABLED.store(flush, Ordering::Relaxed);
}

/// Tag the current OS thread with a worker id for subsequent log lines.
pub fn set_worker_id(id: usize) {
    WORKER_ID.with(|w| w.set(Some(id as u32)));
}

fn level_enabled(level: Level) -> bool {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    level as u8 <= LOG_LEVEL.load(Ordering::Relaxed)
}

#[doc(hidden)]
pub fn _log_impl(level: Level, args: std::fmt::Arguments<'_>) {
    if !level_enabled(level) {
        return;
    }
    let worker = WORKER_ID.with(|w| w.get());
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    match worker {
        Some(id) => {
            let _ = write!(handle, "{} [w{}] ", level.prefix(), id);
        }
        None => {
            let _ = write!(handle, "{} [main] ", level.prefix());
        }
    }
    let _ = handle.write_fmt(args);
    let _ = handle.write_all(b"\n");
    if FLUSH_ENABLED.load(Ordering::Relaxed) {
        let _ = handle.flush();
    }
}

#[macro_export]
macro_rules! rlog_error {
    ($($arg:tt)*) => { $crate::log::_log_impl($crate::log::Level::Error, format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! rlog_warn {
    ($($arg:tt)*) => { $crate::log::_log_impl($crate::log::Level::Warn, format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! rlog_info {
    ($($arg:tt)*) => { $crate::log::_log_impl($crate::log::Level::Info, format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! rlog_debug {
    ($($arg:tt)*) => { $crate::log::_log_impl($crate::log::Level::Debug, format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! rlog_trace {
    ($($arg:tt)*) => { $crate::log::_log_impl($crate::log::Level::Trace, format_args!($($arg)*)) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering() {
        assert!(Level::Error < Level::Warn);
        assert!(Level::Warn < Level::Info);
        assert!(Level::Info < Level::Debug);
        assert!(Level::Debug < Level::Trace);
    }

    #[test]
    fn worker_id_roundtrip() {
        assert_eq!(WORKER_ID.with(|w| w.get()), None);
        set_worker_id(3);
        assert_eq!(WORKER_ID.with(|w| w.get()), Some(3));
    }
}
