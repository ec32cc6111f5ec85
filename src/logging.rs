//! Logging setup with secret redaction
//!
//! Every event passes through [`RedactingFormatter`], which wraps the stock
//! `tracing-subscriber` formatter and scrubs known secrets from the finished
//! line before it reaches the writer. It is handed to the subscriber builder
//! once at startup; nothing mutates logging state afterwards.

use std::borrow::Cow;
use std::fmt;
use tracing::dispatcher::SetGlobalDefaultError;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::FmtSubscriber;

/// Replaces literal occurrences of secrets with a placeholder
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    patterns: Vec<String>,
}

impl Redactor {
    pub const PLACEHOLDER: &'static str = "***";

    pub fn new<I, P>(patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let mut patterns: Vec<String> = patterns
            .into_iter()
            .map(Into::into)
            .filter(|p| !p.is_empty())
            .collect();
        // Longest first, so a secret that contains another is not half-masked
        patterns.sort_by(|a, b| b.len().cmp(&a.len()));
        Self { patterns }
    }

    pub fn redact<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut text = Cow::Borrowed(text);
        for pattern in &self.patterns {
            if text.contains(pattern.as_str()) {
                text = Cow::Owned(text.replace(pattern.as_str(), Self::PLACEHOLDER));
            }
        }
        text
    }
}

/// Event formatter decorator that redacts the wrapped formatter's output
pub struct RedactingFormatter<F> {
    inner: F,
    redactor: Redactor,
}

impl<F> RedactingFormatter<F> {
    pub fn new(inner: F, redactor: Redactor) -> Self {
        Self { inner, redactor }
    }
}

impl<S, N, F> FormatEvent<S, N> for RedactingFormatter<F>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    F: FormatEvent<S, N>,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut line = String::new();
        self.inner.format_event(ctx, Writer::new(&mut line), event)?;
        writer.write_str(&self.redactor.redact(&line))
    }
}

/// Install the global subscriber: stderr, `warn` by default, `debug` when
/// verbose, `RUST_LOG` overrides both.
pub fn init(verbose: bool, redactor: Redactor) -> Result<(), SetGlobalDefaultError> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .event_format(RedactingFormatter::new(
            format().with_target(false),
            redactor,
        ))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}
