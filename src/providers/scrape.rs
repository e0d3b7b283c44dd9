use crate::core::rate::{FetchError, Rate, RateSource, parse_rate_text};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, instrument};

/// Finds the element matching `selector` in `html` and parses its text as a rate.
pub fn extract_rate(html: &str, selector: &str) -> Result<Rate, FetchError> {
    let parsed = Selector::parse(selector)
        .map_err(|e| FetchError::Parse(format!("invalid selector {selector}: {e}")))?;
    let document = Html::parse_document(html);
    let element = document
        .select(&parsed)
        .next()
        .ok_or_else(|| FetchError::FieldNotFound(selector.to_string()))?;

    let text: String = element.text().collect();
    parse_rate_text(&text)
}

/// Reads the rate from the raw HTML served at `url`.
///
/// Only works when the page renders the rate server side. Use
/// [`super::rendered::RenderedRateSource`] for pages that fill it in with
/// scripts.
pub struct HttpRateSource {
    url: String,
    selector: String,
    client: reqwest::Client,
}

impl HttpRateSource {
    pub fn new(url: &str, selector: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent("nairaprice/1.0")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            url: url.to_string(),
            selector: selector.to_string(),
            client,
        })
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    #[instrument(name = "HttpRateFetch", skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Rate, FetchError> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Network(format!(
                "HTTP error: {} for {}",
                response.status(),
                self.url
            )));
        }

        let body = response.text().await?;
        let rate = extract_rate(&body, &self.selector)?;
        debug!(%rate, "Parsed rate from page");
        Ok(rate)
    }
}
