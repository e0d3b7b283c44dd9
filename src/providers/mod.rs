pub mod rendered;
pub mod scrape;
pub mod util;

use crate::core::config::{SourceConfig, SourceKind};
use crate::core::rate::{FetchError, RateSource};
use rendered::RenderedRateSource;
use scrape::HttpRateSource;
use std::sync::Arc;

/// Builds the rate source selected by `config`.
pub fn build_source(config: &SourceConfig) -> Result<Arc<dyn RateSource>, FetchError> {
    let timeout = config.timeout();
    let source: Arc<dyn RateSource> = match config.kind {
        SourceKind::Http => Arc::new(HttpRateSource::new(
            &config.url,
            &config.selector,
            timeout,
        )?),
        SourceKind::Rendered => Arc::new(RenderedRateSource::new(
            &config.url,
            &config.selector,
            &config.browser.program,
            config.browser.args.clone(),
            timeout,
        )),
    };
    Ok(source)
}
