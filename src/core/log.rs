use tracing_subscriber::{
    EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "warn,nairaprice=debug"
    } else {
        "warn,nairaprice=info"
    }
}

/// Installs the global subscriber. `RUST_LOG`, when set, replaces the
/// defaults entirely.
pub fn init_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(env_filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        let quiet = EnvFilter::try_new(default_directives(false)).unwrap();
        assert!(quiet.to_string().contains("nairaprice=info"));

        let verbose = EnvFilter::try_new(default_directives(true)).unwrap();
        assert!(verbose.to_string().contains("nairaprice=debug"));
    }
}
