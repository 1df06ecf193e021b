/// Tag-based console logger
///
/// Colored, timestamped output with per-subsystem tags. Debug output is
/// gated globally by the --debug CLI flag (set once at startup).
use chrono::Utc;
use colored::*;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Subsystem tags for log filtering and readability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTag {
    Api,
    Cache,
    Proxy,
    Config,
    Webserver,
}

impl LogTag {
    fn as_str(&self) -> &'static str {
        match self {
            LogTag::Api => "API",
            LogTag::Cache => "CACHE",
            LogTag::Proxy => "PROXY",
            LogTag::Config => "CONFIG",
            LogTag::Webserver => "WEB",
        }
    }
}

/// Enable debug-level output (called once from main after parsing args)
pub fn init(debug: bool) {
    DEBUG_ENABLED.store(debug, Ordering::Relaxed);
}

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

fn emit(symbol: ColoredString, tag: LogTag, message: &str) {
    println!(
        "{} {} {} {}",
        symbol,
        format!("[{}]", timestamp()).dimmed(),
        format!("[{}]", tag.as_str()).bold(),
        message
    );
    let _ = io::stdout().flush();
}

pub fn info(tag: LogTag, message: &str) {
    emit("ℹ".blue().bold(), tag, message);
}

pub fn warning(tag: LogTag, message: &str) {
    emit("⚠".yellow().bold(), tag, &message.yellow().to_string());
}

pub fn error(tag: LogTag, message: &str) {
    emit("❌".red().bold(), tag, &message.red().to_string());
}

pub fn debug(tag: LogTag, message: &str) {
    if DEBUG_ENABLED.load(Ordering::Relaxed) {
        emit("🐛".purple().bold(), tag, &message.dimmed().to_string());
    }
}
