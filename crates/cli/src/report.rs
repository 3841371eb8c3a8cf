//! Discrepancy report rendering: human table, CSV, or the full JSON result.

use std::io::Write;
use std::path::Path;

use vinrecon_recon::model::format_cents;
use vinrecon_recon::ReconResult;

use crate::exit_codes::EXIT_OUTPUT;
use crate::CliError;

pub const COLUMNS: [&str; 5] = ["VIN", "Vehicle Type", "Price A", "Price B", "Discrepancy"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Table,
    Csv,
    Json,
}

impl ReportFormat {
    /// `.json` → JSON, anything else → CSV.
    pub fn from_extension(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Csv,
        }
    }
}

fn output_err(msg: impl Into<String>) -> CliError {
    CliError::new(EXIT_OUTPUT, msg)
}

fn rows(result: &ReconResult) -> Vec<[String; 5]> {
    result
        .discrepancies
        .iter()
        .map(|d| {
            [
                d.vin.clone(),
                d.vehicle_type.to_string(),
                format_cents(d.price_a_cents),
                format_cents(d.price_b_cents),
                format_cents(d.discrepancy_cents),
            ]
        })
        .collect()
}

pub fn render_csv(result: &ReconResult) -> Result<Vec<u8>, CliError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(COLUMNS)
        .map_err(|e| output_err(format!("CSV write error: {e}")))?;
    for row in rows(result) {
        wtr.write_record(&row)
            .map_err(|e| output_err(format!("CSV write error: {e}")))?;
    }
    wtr.into_inner()
        .map_err(|e| output_err(format!("CSV write error: {e}")))
}

pub fn render_json(result: &ReconResult) -> Result<Vec<u8>, CliError> {
    let mut out = serde_json::to_vec_pretty(result)
        .map_err(|e| output_err(format!("JSON serialization error: {e}")))?;
    out.push(b'\n');
    Ok(out)
}

/// Fixed-width table. Prices right-aligned.
pub fn render_table(result: &ReconResult) -> String {
    let rows = rows(result);
    if rows.is_empty() {
        return "no price discrepancies\n".to_string();
    }

    let mut widths = COLUMNS.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: [&str; 5]| -> String {
        let mut s = String::new();
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                s.push_str("  ");
            }
            if i >= 2 {
                s.push_str(&format!("{:>width$}", cell, width = widths[i]));
            } else {
                s.push_str(&format!("{:<width$}", cell, width = widths[i]));
            }
        }
        s.trim_end().to_string()
    };

    let mut out = String::new();
    out.push_str(&line(COLUMNS));
    out.push('\n');
    out.push_str(&line(widths.map(|w| "-".repeat(w)).each_ref().map(String::as_str)));
    out.push('\n');
    for row in &rows {
        out.push_str(&line(row.each_ref().map(String::as_str)));
        out.push('\n');
    }
    out
}

/// Render and write to `output`, or to stdout when none is given.
pub fn write(result: &ReconResult, format: ReportFormat, output: Option<&Path>) -> Result<(), CliError> {
    let bytes = match format {
        ReportFormat::Table => render_table(result).into_bytes(),
        ReportFormat::Csv => render_csv(result)?,
        ReportFormat::Json => render_json(result)?,
    };

    match output {
        Some(path) => {
            std::fs::write(path, &bytes)
                .map_err(|e| output_err(format!("cannot write {}: {e}", path.display())))?;
            log::info!("wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&bytes)
                .and_then(|_| stdout.flush())
                .map_err(|e| output_err(format!("cannot write report: {e}")))?;
        }
    }
    Ok(())
}
