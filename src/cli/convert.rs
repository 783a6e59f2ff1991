use super::show::refresh_with_spinner;
use super::ui;
use crate::core::RefreshOrchestrator;
use crate::core::convert::{Conversion, Field, convert};
use anyhow::{Context, Result, bail};
use comfy_table::{Attribute, Cell};

pub fn conversion_table(conversion: &Conversion) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Amount")]);

    for field in Field::ALL {
        let mut name = Cell::new(field.to_string());
        if field == conversion.source {
            name = name.add_attribute(Attribute::Bold);
        }
        let amount =
            ui::format_optional_cell(conversion.rounded(field), |v| ui::format_number(v, field.decimals()));
        table.add_row(vec![name, amount]);
    }
    table.to_string()
}

pub async fn run(orchestrator: &RefreshOrchestrator, field: Field, amount: f64) -> Result<()> {
    if !amount.is_finite() {
        bail!("Enter a valid amount in a single field");
    }

    let outcome = refresh_with_spinner(orchestrator).await;
    if !outcome.advisory.is_empty() {
        eprintln!("{}", ui::style_text(&outcome.advisory, ui::StyleType::Error));
    }

    let conversion = convert(field, amount, &outcome.snapshot)
        .with_context(|| format!("Cannot convert from {field}"))?;

    println!(
        "{} {}\n\n{}",
        ui::style_text(&ui::format_number(amount, field.decimals()), ui::StyleType::TotalLabel),
        ui::style_text(&field.to_string(), ui::StyleType::TotalLabel),
        conversion_table(&conversion)
    );
    Ok(())
}
