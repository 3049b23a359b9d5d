use std::{env, fmt, str::FromStr};

/// Output format of the console layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        };
        f.write_str(name)
    }
}

/// Logging settings for binaries embedding the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Level for this crate's events (`trace`..`error`).
    pub level: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
}

impl LoggingConfig {
    /// Overrides fields from `INPUBSUB_LOG_LEVEL`, `INPUBSUB_LOG_FORMAT` and
    /// `INPUBSUB_LOG_ANSI`. Unparsable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("INPUBSUB_LOG_LEVEL") {
            if !level.trim().is_empty() {
                self.level = level.trim().to_ascii_lowercase();
            }
        }
        if let Some(format) = env::var("INPUBSUB_LOG_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.format = format;
        }
        if let Some(ansi) = env::var("INPUBSUB_LOG_ANSI")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.with_ansi = ansi;
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => Ok(()),
            other => Err(format!("invalid log level '{other}'")),
        }
    }

    /// Filter directive used when `RUST_LOG` is not set.
    pub fn build_filter_directive(&self) -> String {
        format!("warn,inpubsub={}", self.level)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::default(),
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
        }
    }
}
