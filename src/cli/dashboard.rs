use super::ui;
use crate::rate::RateService;
use crate::wallet::{DayGroup, WalletService};
use anyhow::Result;
use comfy_table::Cell;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;

impl DayGroup {
    pub fn display_as_table(&self, rate: Option<f64>) -> String {
        let mut table = ui::new_styled_table();

        let mut header = vec![
            ui::header_cell("Time"),
            ui::header_cell("Category"),
            ui::header_cell("Amount"),
        ];
        if rate.is_some() {
            header.push(ui::header_cell("Value (USD)"));
        }
        table.set_header(header);

        for transaction in &self.transactions {
            let mut row = vec![
                Cell::new(
                    transaction
                        .date
                        .with_timezone(&chrono::Local)
                        .format("%H:%M")
                        .to_string(),
                ),
                Cell::new(&transaction.category),
                ui::amount_cell(transaction.amount),
            ];
            if let Some(rate) = rate {
                let usd = transaction.amount.to_f64().unwrap_or(0.0) * rate;
                row.push(Cell::new(format!("{usd:.2}")));
            }
            table.add_row(row);
        }

        let day = self.day.format("%Y-%m-%d (%A)").to_string();
        format!(
            "{}\n{}",
            ui::style_text(&day, ui::StyleType::Title),
            table
        )
    }
}

pub async fn run(wallet: &WalletService, rate_service: &Arc<RateService>, pages: usize) -> Result<()> {
    wallet.refresh().await?;

    if pages > 1 {
        let pb = ui::new_progress_bar((pages - 1) as u64, true);
        pb.set_message("Loading transactions...");
        for _ in 1..pages {
            if !wallet.load_next_page().await? {
                break;
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
    }

    // One fetch through the poller path; a failure falls back to the
    // cached rate and the dashboard renders without USD values otherwise.
    rate_service.fetch().await;
    let rate = rate_service.cached_rate().await;

    let balance = wallet.balance().await;
    let balance_line = format!("{balance} BTC");
    println!(
        "{} {}",
        ui::style_text("Balance:", ui::StyleType::TotalLabel),
        ui::style_text(&balance_line, ui::StyleType::TotalValue)
    );
    match rate {
        Some(rate) => {
            let usd_value = balance.to_f64().unwrap_or(0.0) * rate;
            println!(
                "{} 1 BTC = {rate:.2} USD (~{usd_value:.2} USD total)",
                ui::style_text("Rate:", ui::StyleType::TotalLabel)
            );
        }
        None => println!(
            "{} {}",
            ui::style_text("Rate:", ui::StyleType::TotalLabel),
            ui::style_text("unavailable", ui::StyleType::Error)
        ),
    }

    let groups = wallet.grouped_transactions().await;
    if groups.is_empty() {
        println!(
            "\n{}",
            ui::style_text("No transactions yet", ui::StyleType::Subtle)
        );
        return Ok(());
    }

    for group in &groups {
        println!("\n{}", group.display_as_table(rate));
    }

    if !wallet.all_loaded().await {
        println!(
            "\n{}",
            ui::style_text("More transactions available, rerun with --pages", ui::StyleType::Subtle)
        );
    }

    Ok(())
}
