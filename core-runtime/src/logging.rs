//! # Logging & Tracing Infrastructure
//!
//! Installs the global `tracing` subscriber for the reconciliation core:
//! - Pretty, JSON or compact output on stdout
//! - Per-crate level directives through `EnvFilter`
//! - Optional forwarding of every event to a host
//!   [`LoggerSink`](bridge_traits::logging::LoggerSink)
//!
//! Fields forwarded to the host go through a [`FieldPolicy`]: credentials are
//! replaced with `[REDACTED]` and absolute paths (library roots, the relaunch
//! executable) are cut down to their last component, so host log files do not
//! collect the user's directory layout.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::logging::{ConsoleLogger, LogLevel};
//! use std::sync::Arc;
//!
//! init_logging(
//!     LoggingConfig::default()
//!         .with_format(LogFormat::Compact)
//!         .with_level(LogLevel::Debug)
//!         .with_logger_sink(Arc::new(ConsoleLogger::default())),
//! )?;
//!
//! tracing::info!(playlist = "Chill", "Reconciler started");
//! ```

use crate::error::{Error, Result};

use bridge_traits::logging::{LogEntry, LogLevel, LoggerSink};

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{
    filter::EnvFilter,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer, Registry,
};

/// Workspace crates that receive the configured level by default.
const WORKSPACE_TARGETS: &[&str] = &[
    "core_runtime",
    "core_auth",
    "core_reconcile",
    "core_metadata",
    "core_service",
    "bridge_desktop",
];

/// Field names whose values are credentials
const SENSITIVE_FIELDS: &[&str] = &[
    "token",
    "secret",
    "password",
    "authorization",
    "bearer",
    "cookie",
    "api_key",
];

/// Field names whose values are filesystem paths
const PATH_FIELDS: &[&str] = &["path", "root", "executable", "source", "dest"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored, for local development
    Pretty,
    /// One JSON object per line
    Json,
    /// Single-line text
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// What happens to field values before they reach the host sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPolicy {
    pub redact_sensitive: bool,
    pub strip_paths: bool,
}

impl Default for FieldPolicy {
    fn default() -> Self {
        Self {
            redact_sensitive: true,
            strip_paths: true,
        }
    }
}

impl FieldPolicy {
    /// Forward values untouched
    pub fn passthrough() -> Self {
        Self {
            redact_sensitive: false,
            strip_paths: false,
        }
    }

    pub fn apply(&self, field_name: &str, value: &str) -> String {
        if self.redact_sensitive && is_sensitive(field_name) {
            return "[REDACTED]".to_string();
        }
        if self.strip_paths && PATH_FIELDS.contains(&field_name) {
            return strip_path(value).to_string();
        }
        value.to_string()
    }
}

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level applied to the workspace crates; everything else logs at `warn`
    pub level: LogLevel,
    /// Full `EnvFilter` directive string, replacing the level-based default
    pub filter: Option<String>,
    pub field_policy: FieldPolicy,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Log span enter/exit, e.g. the coordinator phases
    pub span_events: bool,
    pub display_target: bool,
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            field_policy: FieldPolicy::default(),
            logger_sink: None,
            span_events: false,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_field_policy(mut self, policy: FieldPolicy) -> Self {
        self.field_policy = policy;
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_span_events(mut self, enable: bool) -> Self {
        self.span_events = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// - [`Error::Config`] if the filter directives do not parse
/// - [`Error::Internal`] if a global subscriber is already installed
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let sink_layer = HostSinkLayer::new(config.logger_sink.clone(), config.field_policy);

    tracing_subscriber::registry()
        .with(output_layer(&config))
        .with(filter)
        .with(sink_layer)
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to initialize logging: {}", e)))
}

fn output_layer(config: &LoggingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_span_events(span_events)
        .with_writer(io::stdout);

    match config.format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match &config.filter {
        Some(custom) => custom.clone(),
        None => {
            let level = config.level.as_str().to_ascii_lowercase();
            std::iter::once("warn".to_string())
                .chain(
                    WORKSPACE_TARGETS
                        .iter()
                        .map(|target| format!("{target}={level}")),
                )
                .collect::<Vec<_>>()
                .join(",")
        }
    };

    EnvFilter::try_new(directives).map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

/// Forwards events that passed the filter to the host sink.
struct HostSinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
    policy: FieldPolicy,
}

impl HostSinkLayer {
    fn new(sink: Option<Arc<dyn LoggerSink>>, policy: FieldPolicy) -> Self {
        Self { sink, policy }
    }
}

impl<S> Layer<S> for HostSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        let metadata = event.metadata();
        let level = log_level(metadata.level());
        if level < sink.min_level() {
            return;
        }

        let mut fields = FieldCollector::new(self.policy);
        event.record(&mut fields);

        let message = fields
            .message
            .take()
            .unwrap_or_else(|| metadata.name().to_string());
        let mut entry = LogEntry::new(level, metadata.target(), message);
        entry.fields = fields.values;
        if let Some(span) = ctx.event_span(event) {
            entry.span_id = Some(span.name().to_string());
        }

        let sink = Arc::clone(sink);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = sink.log(entry).await {
                        eprintln!("LoggerSink error: {}", err);
                    }
                });
            }
            Err(_) => {
                if let Err(err) = futures::executor::block_on(sink.log(entry)) {
                    eprintln!("LoggerSink error: {}", err);
                }
            }
        }
    }
}

struct FieldCollector {
    policy: FieldPolicy,
    message: Option<String>,
    values: HashMap<String, String>,
}

impl FieldCollector {
    fn new(policy: FieldPolicy) -> Self {
        Self {
            policy,
            message: None,
            values: HashMap::new(),
        }
    }

    fn insert(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            name => {
                self.values
                    .insert(name.to_string(), self.policy.apply(name, value));
            }
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, &value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, &format!("{:?}", value));
    }
}

fn log_level(level: &tracing::Level) -> LogLevel {
    match *level {
        tracing::Level::TRACE => LogLevel::Trace,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

fn is_sensitive(field_name: &str) -> bool {
    let name = field_name.to_ascii_lowercase();
    SENSITIVE_FIELDS.iter().any(|marker| name.contains(marker))
}

/// `[REDACTED]` for credential fields, the value otherwise.
///
/// ```ignore
/// info!(token = %redact_if_sensitive("token", handle.access_token()), "Session ready");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    if is_sensitive(field_name) {
        "[REDACTED]".to_string()
    } else {
        value.to_string()
    }
}

/// Last component of a Unix or Windows path.
///
/// ```ignore
/// info!(file = %strip_path("/home/me/Music/library/Chill/a.mp3"), "Staged");
/// // file="a.mp3"
/// ```
pub fn strip_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as SinkResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LoggerSink for RecordingSink {
        async fn log(&self, entry: LogEntry) -> SinkResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Debug
        }
    }

    fn capture<F: FnOnce()>(policy: FieldPolicy, emit: F) -> Vec<LogEntry> {
        let sink = Arc::new(RecordingSink::default());
        let trait_sink: Arc<dyn LoggerSink> = sink.clone();
        let subscriber =
            tracing_subscriber::registry().with(HostSinkLayer::new(Some(trait_sink), policy));
        tracing::subscriber::with_default(subscriber, emit);
        let entries = sink.entries.lock().unwrap().clone();
        entries
    }

    #[test]
    fn test_default_filter_covers_workspace_crates() {
        let config = LoggingConfig::default().with_level(LogLevel::Debug);
        let filter = build_filter(&config).unwrap().to_string();

        assert!(filter.contains("core_reconcile=debug"));
        assert!(filter.contains("bridge_desktop=debug"));
    }

    #[test]
    fn test_custom_filter_replaces_default() {
        let config = LoggingConfig::default().with_filter("core_auth=trace");
        let filter = build_filter(&config).unwrap().to_string();

        assert!(filter.contains("core_auth=trace"));
        assert!(!filter.contains("core_reconcile"));
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        let config = LoggingConfig::default().with_filter("core_reconcile=loud");
        assert!(matches!(build_filter(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_sink_receives_structured_fields() {
        let entries = capture(FieldPolicy::passthrough(), || {
            tracing::warn!(
                target: "core_reconcile",
                playlist = "Road Trip",
                file = "a.mp3",
                attempt = 2u64,
                "Relocation failed"
            );
        });

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.target, "core_reconcile");
        assert_eq!(entry.message, "Relocation failed");
        assert_eq!(entry.fields["playlist"], "Road Trip");
        assert_eq!(entry.fields["attempt"], "2");
    }

    #[test]
    fn test_sink_respects_min_level() {
        let entries = capture(FieldPolicy::default(), || {
            tracing::trace!("Too chatty");
            tracing::debug!("Kept");
        });

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Kept");
    }

    #[test]
    fn test_policy_redacts_and_strips() {
        let entries = capture(FieldPolicy::default(), || {
            tracing::info!(
                access_token = "abc123",
                executable = "/opt/player/bin/player",
                file = "disc1/a.mp3",
                "Relaunching"
            );
        });

        let fields = &entries[0].fields;
        assert_eq!(fields["access_token"], "[REDACTED]");
        assert_eq!(fields["executable"], "player");
        // Only known path fields are shortened
        assert_eq!(fields["file"], "disc1/a.mp3");
    }

    #[test]
    fn test_span_name_attached() {
        let entries = capture(FieldPolicy::default(), || {
            let span = tracing::info_span!("poll_round");
            let _entered = span.enter();
            tracing::info!("Round finished");
        });

        assert_eq!(entries[0].span_id.as_deref(), Some("poll_round"));
    }
}
