use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive, e.g. `qscore=debug`.
pub const LOG_ENV: &str = "QSCORE_LOG";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log level/filter '{value}': unable to build EnvFilter")]
    EnvFilter {
        value: String,
        #[source]
        source: ParseError,
    },

    #[error("telemetry error: {0}")]
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

/// Level used when `QSCORE_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "qscore=debug"
    } else {
        "qscore=warn"
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays parseable.
pub fn init(verbose: bool) -> Result<(), TelemetryError> {
    let env_filter = match std::env::var(LOG_ENV) {
        Ok(value) if !value.trim().is_empty() => {
            EnvFilter::try_new(&value).map_err(|source| TelemetryError::EnvFilter { value, source })?
        }
        _ => {
            let value = default_directive(verbose);
            EnvFilter::try_new(value).map_err(|source| TelemetryError::EnvFilter {
                value: value.to_string(),
                source,
            })?
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .without_time()
        .try_init()
        .map_err(TelemetryError::Subscriber)
}
