//! JSON, CSV and XLSX exporters
//!
//! All three consume the final, ordered record list. Column order comes from
//! the first record's fields.

use chrono::NaiveDate;
use regwatch_common::{ExportFiles, Record, RegwatchError, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::schema::{value_text, Schema};

pub const DATA_SHEET: &str = "New Companies";
pub const SUMMARY_SHEET: &str = "Summary";

/// Sole cell of the data sheet when nothing matched
pub const EMPTY_NOTICE: &str = "No new companies in the selected window";

/// Artifact file stem for a run date, e.g. `new_companies_2024-01-10`
pub fn file_stem(run_date: NaiveDate) -> String {
    format!("new_companies_{}", run_date.format("%Y-%m-%d"))
}

/// Pretty-printed JSON array
pub fn to_json(records: &[Record]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// CSV with a header row; empty string for an empty set.
///
/// Cells containing a comma, quote or line break are quoted with inner quotes
/// doubled.
pub fn to_csv(records: &[Record]) -> Result<String> {
    let Some(first) = records.first() else {
        return Ok(String::new());
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(&headers).map_err(csv_err)?;
    for record in records {
        writer
            .write_record(headers.iter().map(|h| value_text(record.get(*h))))
            .map_err(csv_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| RegwatchError::Export(format!("CSV flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| RegwatchError::Export(format!("CSV is not UTF-8: {e}")))
}

/// XLSX workbook bytes: a data sheet plus a per-day summary sheet.
pub fn to_xlsx(records: &[Record], schema: &Schema) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(DATA_SHEET).map_err(xlsx_err)?;

    if records.is_empty() {
        sheet.write_string(0, 0, EMPTY_NOTICE).map_err(xlsx_err)?;
    } else {
        write_data_sheet(sheet, records, &bold).map_err(xlsx_err)?;

        let summary = workbook.add_worksheet();
        summary.set_name(SUMMARY_SHEET).map_err(xlsx_err)?;
        write_summary_sheet(summary, &daily_counts(records, schema), &bold).map_err(xlsx_err)?;
    }

    workbook.save_to_buffer().map_err(xlsx_err)
}

fn write_data_sheet(
    sheet: &mut Worksheet,
    records: &[Record],
    bold: &Format,
) -> std::result::Result<(), XlsxError> {
    let headers: Vec<&String> = match records.first() {
        Some(first) => first.keys().collect(),
        None => return Ok(()),
    };

    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, column(col)?, header.as_str(), bold)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    for (idx, record) in records.iter().enumerate() {
        let row = u32::try_from(idx + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (col, header) in headers.iter().enumerate() {
            let col = column(col)?;
            match record.get(header.as_str()) {
                None | Some(Value::Null) => {},
                Some(Value::Number(n)) => match n.as_f64() {
                    Some(f) => {
                        sheet.write_number(row, col, f)?;
                    },
                    None => {
                        sheet.write_string(row, col, n.to_string())?;
                    },
                },
                Some(Value::Bool(b)) => {
                    sheet.write_boolean(row, col, *b)?;
                },
                Some(Value::String(s)) => {
                    sheet.write_string(row, col, s.as_str())?;
                },
                Some(other) => {
                    sheet.write_string(row, col, other.to_string())?;
                },
            }
        }
    }

    Ok(())
}

fn write_summary_sheet(
    sheet: &mut Worksheet,
    counts: &BTreeMap<NaiveDate, u32>,
    bold: &Format,
) -> std::result::Result<(), XlsxError> {
    sheet.write_string_with_format(0, 0, "Date", bold)?;
    sheet.write_string_with_format(0, 1, "Count", bold)?;

    for (idx, (date, count)) in counts.iter().enumerate() {
        let row = u32::try_from(idx + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        sheet.write_string(row, 0, date.format("%Y-%m-%d").to_string())?;
        sheet.write_number(row, 1, *count)?;
    }

    Ok(())
}

/// Record count per registration date, ascending; undated records are skipped.
pub fn daily_counts(records: &[Record], schema: &Schema) -> BTreeMap<NaiveDate, u32> {
    let mut counts = BTreeMap::new();
    for date in records.iter().filter_map(|r| schema.date_of(r)) {
        *counts.entry(date).or_insert(0) += 1;
    }
    counts
}

/// Write all three artifacts into `out_dir`, stamped with `run_date`.
pub async fn write_exports(
    records: &[Record],
    schema: &Schema,
    out_dir: &Path,
    run_date: NaiveDate,
) -> Result<ExportFiles> {
    tokio::fs::create_dir_all(out_dir).await?;

    let stem = file_stem(run_date);
    let json = out_dir.join(format!("{stem}.json"));
    let csv = out_dir.join(format!("{stem}.csv"));
    let xlsx = out_dir.join(format!("{stem}.xlsx"));

    tokio::fs::write(&json, to_json(records)?).await?;
    tokio::fs::write(&csv, to_csv(records)?).await?;
    tokio::fs::write(&xlsx, to_xlsx(records, schema)?).await?;

    info!(
        records = records.len(),
        dir = %out_dir.display(),
        stem = %stem,
        "Wrote exports"
    );

    Ok(ExportFiles {
        json: Some(json),
        csv: Some(csv),
        xlsx: Some(xlsx),
    })
}

fn column(idx: usize) -> std::result::Result<u16, XlsxError> {
    u16::try_from(idx).map_err(|_| XlsxError::RowColumnLimitError)
}

fn csv_err(e: csv::Error) -> RegwatchError {
    RegwatchError::Export(format!("CSV: {e}"))
}

fn xlsx_err(e: XlsxError) -> RegwatchError {
    RegwatchError::Export(format!("XLSX: {e}"))
}
