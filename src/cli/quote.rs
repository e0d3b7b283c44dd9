use super::ui;
use crate::core::manager::RateManager;
use crate::core::pricing::{self, Quote};
use anyhow::Result;
use comfy_table::Cell;

impl Quote {
    pub fn display_as_table(&self, cost_price: f64, shipping_cost: f64) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Item"), ui::header_cell("Amount")]);

        table.add_row(vec![Cell::new("Cost price (USD)"), ui::amount_cell(cost_price)]);
        table.add_row(vec![
            Cell::new("Shipping (USD)"),
            ui::amount_cell(shipping_cost),
        ]);
        table.add_row(vec![
            Cell::new("Exchange rate (NGN/USD)"),
            ui::amount_cell(self.exchange_rate),
        ]);
        table.add_row(vec![
            Cell::new("Selling price (USD)"),
            ui::total_cell(self.usd_price),
        ]);
        table.add_row(vec![
            Cell::new("Selling price (NGN)"),
            ui::total_cell(self.naira_price),
        ]);

        let mut output = format!("{}\n\n", ui::style_text("Price Quote", ui::StyleType::Title));
        output.push_str(&table.to_string());
        output
    }
}

/// Prints the selling price for the given costs using the current rate.
pub async fn run(manager: &RateManager, cost_price: f64, shipping_cost: f64) -> Result<()> {
    // Reject bad input before touching the network
    pricing::compute(cost_price, shipping_cost, 1.0)?;

    let spinner = ui::new_spinner("Fetching exchange rate");
    manager.cache().restore(manager.policy().freshness).await;
    let rate = manager.get_rate().await;
    spinner.finish_and_clear();

    let quote = pricing::compute(cost_price, shipping_cost, rate?.value())?;
    println!("{}", quote.display_as_table(cost_price, shipping_cost));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::RateCache;
    use crate::core::manager::RatePolicy;
    use crate::core::rate::{FetchError, Rate, RateSnapshot, RateSource};
    use crate::store::backup::{BackupFile, BackupRecord};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::{TempDir, tempdir};

    #[derive(Default)]
    struct DownSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RateSource for DownSource {
        async fn fetch(&self) -> Result<Rate, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Network("connection refused".to_string()))
        }
    }

    fn manager(source: &Arc<DownSource>) -> (RateManager, TempDir) {
        let dir = tempdir().unwrap();
        let cache = RateCache::new(BackupFile::new(dir.path().join("last_rate.json")));
        let policy = RatePolicy {
            backoff_unit: Duration::ZERO,
            ..RatePolicy::default()
        };
        let source: Arc<dyn RateSource> = source.clone();
        (RateManager::new(source, cache, policy), dir)
    }

    #[tokio::test]
    async fn test_run_fetches_once_per_attempt_when_source_is_down() {
        let source = Arc::new(DownSource::default());
        let (manager, _dir) = manager(&source);

        assert!(run(&manager, 100.0, 20.0).await.is_err());
        assert_eq!(
            source.calls.load(Ordering::SeqCst),
            manager.policy().max_attempts as usize
        );
    }

    #[tokio::test]
    async fn test_run_uses_fresh_backup_without_fetching() {
        let source = Arc::new(DownSource::default());
        let (manager, dir) = manager(&source);
        let snapshot = RateSnapshot::now(Rate::new(1500.0).unwrap());
        BackupFile::new(dir.path().join("last_rate.json"))
            .write(&BackupRecord::from_snapshot(&snapshot))
            .await
            .unwrap();

        run(&manager, 100.0, 20.0).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_rejects_negative_cost_before_fetching() {
        let source = Arc::new(DownSource::default());
        let (manager, _dir) = manager(&source);

        assert!(run(&manager, -1.0, 0.0).await.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_display_as_table() {
        let quote = pricing::compute(100.0, 20.0, 1500.0).unwrap();
        let output = quote.display_as_table(100.0, 20.0);

        assert!(output.contains("Price Quote"));
        assert!(output.contains("Selling price (NGN)"));
        assert!(output.contains("306,500.00"));
        assert!(output.contains("201.00"));
        assert!(output.contains("1,500.00"));
    }
}
