use super::ui;
use crate::core::RefreshOrchestrator;
use crate::core::clock::day_key;
use crate::core::gold::GoldBlock;
use anyhow::Result;
use comfy_table::Cell;

pub async fn run(orchestrator: &RefreshOrchestrator) -> Result<()> {
    let now = orchestrator.now();
    let day = now.date();
    let policy = orchestrator.policy();
    let quota = orchestrator.cache().load_quota(day).await;

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Item"), ui::header_cell("Status")]);
    table.add_row(vec![
        Cell::new("Queries today"),
        Cell::new(format!("{}/{}", quota.count, policy.max_per_day)),
    ]);
    table.add_row(vec![
        Cell::new("Last query"),
        quota
            .last_fetch_timestamp
            .as_deref()
            .map_or(ui::na_cell(), Cell::new),
    ]);
    table.add_row(vec![
        Cell::new("Fetch window"),
        Cell::new(format!(
            "{:02}:00-{:02}:00",
            policy.window_start, policy.window_end
        )),
    ]);
    table.add_row(vec![
        Cell::new("Remote fetch allowed"),
        Cell::new(if policy.can_fetch(now, &quota) { "yes" } else { "no" }),
    ]);

    let current_block = GoldBlock::resolve(now);
    for block in [GoldBlock::Am, GoldBlock::Pm] {
        let quote = orchestrator.cache().load_gold_block(day, block).await;
        let marker = if block == current_block { " (current)" } else { "" };
        table.add_row(vec![
            Cell::new(format!("Gold block {block}{marker}")),
            ui::format_optional_cell(quote.map(|q| q.value), |v| {
                format!("CLP$ {}", ui::format_number(v, 0))
            }),
        ]);
    }

    println!(
        "Quota for {}\n\n{}",
        ui::style_text(&day_key(day), ui::StyleType::Title),
        table
    );
    Ok(())
}
