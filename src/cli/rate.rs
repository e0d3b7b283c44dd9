use super::ui;
use crate::core::manager::RateManager;
use crate::core::rate::Rate;
use anyhow::Result;

/// Fetches the rate once, bypassing any cached value, and prints it.
pub async fn run(manager: &RateManager) -> Result<()> {
    let spinner = ui::new_spinner("Fetching exchange rate");
    let result = manager.refresh().await;
    spinner.finish_and_clear();

    let rate = match result {
        Ok(rate) => rate,
        Err(e) => {
            eprintln!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
            return Err(e.into());
        }
    };
    let origin = describe_origin(manager, rate).await;

    println!(
        "{}: {} NGN/USD {}",
        ui::style_text("USD sell rate", ui::StyleType::TotalLabel),
        ui::style_text(&ui::format_amount(rate.value()), ui::StyleType::TotalValue),
        ui::style_text(&format!("({origin})"), ui::StyleType::Subtle),
    );
    Ok(())
}

/// Says where a rate returned by `refresh` came from. The backup is consulted
/// before the configured fallback rate, so it is checked first here too.
async fn describe_origin(manager: &RateManager, rate: Rate) -> String {
    if let Some(snapshot) = manager.cache().snapshot()
        && snapshot.rate == rate
    {
        return format!("fetched {}", snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    let policy = manager.policy();
    if manager.cache().load_backup(policy.backup_max_age).await == Some(rate) {
        return "from backup".to_string();
    }
    if policy.fallback_rate == Some(rate) {
        return "configured fallback rate".to_string();
    }
    "from backup".to_string()
}
