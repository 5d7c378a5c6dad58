// Logger initialization

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "oxidized_biblio=info";

/// Install the global tracing subscriber. `RUST_LOG` wins over `verbosity`
/// (0 = info, 1 = debug, 2+ = trace).
pub fn init_logger(verbosity: u8) {
    let fallback = match verbosity {
        0 => DEFAULT_FILTER.to_string(),
        1 => "oxidized_biblio=debug".to_string(),
        _ => "oxidized_biblio=trace,reqwest=debug".to_string(),
    };

    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}
