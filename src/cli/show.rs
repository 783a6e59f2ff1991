use super::ui;
use crate::core::{
    IndicatorCode, IndicatorSnapshot, Presenter, RefreshOrchestrator, RefreshOutcome,
    SnapshotOrigin,
};
use anyhow::Result;
use comfy_table::{Cell, CellAlignment};
use indicatif::ProgressBar;

/// Formats an indicator value the way it is quoted locally.
pub fn format_indicator(code: IndicatorCode, value: f64) -> String {
    match code {
        IndicatorCode::Clp | IndicatorCode::Btc | IndicatorCode::Oro => {
            format!("CLP$ {}", ui::format_number(value, 0))
        }
        IndicatorCode::Ipc | IndicatorCode::Imacec => format!("{}%", ui::format_number(value, 1)),
        IndicatorCode::Cobre => format!("{} USD/lb", ui::format_number(value, 2)),
        IndicatorCode::Uf | IndicatorCode::Usd | IndicatorCode::Eur | IndicatorCode::Utm => {
            format!("CLP$ {}", ui::format_number(value, 2))
        }
    }
}

pub fn snapshot_table(snapshot: &IndicatorSnapshot, advisory: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Indicator"),
        ui::header_cell("Value"),
        ui::header_cell("Updated"),
    ]);

    for (code, reading) in snapshot.iter() {
        let value = ui::format_optional_cell(reading.value, |v| format_indicator(code, v));
        let updated = reading.timestamp.as_deref().map_or(ui::na_cell(), |ts| {
            Cell::new(ui::format_timestamp(ts)).set_alignment(CellAlignment::Right)
        });
        table.add_row(vec![Cell::new(code.label()), value, updated]);
    }

    let mut output = format!(
        "{}\n\n{}",
        ui::style_text("Indicadores", ui::StyleType::Title),
        table
    );
    if !advisory.is_empty() {
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text(advisory, ui::StyleType::Error)
        ));
    }
    output
}

/// Prints the snapshot table to stdout, clearing the refresh spinner first.
pub struct TablePresenter {
    spinner: ProgressBar,
}

impl TablePresenter {
    pub fn new() -> Self {
        Self {
            spinner: ui::new_spinner("Refreshing indicators"),
        }
    }
}

impl Presenter for TablePresenter {
    fn render(&self, snapshot: &IndicatorSnapshot, advisory: &str) {
        self.spinner.finish_and_clear();
        println!("{}", snapshot_table(snapshot, advisory));
    }
}

/// Refreshes the indicators with a spinner on screen.
pub async fn refresh_with_spinner(orchestrator: &RefreshOrchestrator) -> RefreshOutcome {
    let pb = ui::new_spinner("Refreshing indicators");
    let outcome = orchestrator.refresh().await;
    pb.finish_and_clear();
    outcome
}

pub async fn run(orchestrator: &RefreshOrchestrator) -> Result<()> {
    let outcome = orchestrator
        .refresh_and_render(&TablePresenter::new())
        .await;

    if outcome.origin == SnapshotOrigin::Cached {
        println!(
            "\n{}",
            ui::style_text("Showing stored data for today.", ui::StyleType::Subtle)
        );
    }
    for error in &outcome.cache_errors {
        eprintln!("{}", ui::style_text(&error.to_string(), ui::StyleType::Error));
    }
    Ok(())
}
