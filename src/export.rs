// src/export.rs
//! Spreadsheet export: a `Jobs` sheet with a fixed column schema and a
//! `Metadata` sheet recording who served the request and when.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc};
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, Workbook, Worksheet};

use crate::aggregate::SourceSummary;
use crate::error::AggregatorError;
use crate::sources::JobRecord;

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Header label and column width, in sheet order.
pub const COLUMNS: [(&str, f64); 14] = [
    ("Job Title", 30.0),
    ("Company Name", 25.0),
    ("Location", 25.0),
    ("Job Type", 20.0),
    ("Experience Required", 20.0),
    ("Salary", 20.0),
    ("Posted Date", 20.0),
    ("Apply Link", 50.0),
    ("Job Description", 50.0),
    ("Job ID", 20.0),
    ("Category", 20.0),
    ("Remote/Onsite", 15.0),
    ("Contact Email", 25.0),
    ("Source", 20.0),
];

/// Excel rejects longer cell strings.
const MAX_CELL_CHARS: usize = 32_767;

/// Audit data written to the second sheet.
#[derive(Debug, Clone)]
pub struct ExportMetadata {
    pub credential: String,
    pub generated_at: DateTime<FixedOffset>,
    pub sources: Vec<SourceSummary>,
}

fn or_default(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Cell values for one record, in `COLUMNS` order, with fallbacks applied.
pub fn export_row(job: &JobRecord) -> [String; 14] {
    [
        job.title.clone(),
        job.organization.clone(),
        job.location.clone(),
        job.employment_type.clone(),
        or_default(&job.employment_type, "Not specified"),
        or_default(&job.salary, "Not specified"),
        job.date_posted.clone(),
        job.url.clone(),
        job.description.clone(),
        job.id.clone(),
        or_default(&job.category, "Software"),
        or_default(&job.remote_onsite, "Not specified"),
        or_default(&job.contact_email, "N/A"),
        or_default(&job.source, "Unknown"),
    ]
}

/// `2024-01-02.xlsx`
pub fn attachment_filename(date: NaiveDate) -> String {
    format!("{}.xlsx", date.format("%Y-%m-%d"))
}

fn clip(s: &str) -> &str {
    match s.char_indices().nth(MAX_CELL_CHARS) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Document creation time, taken from the injected clock.
fn creation_time(at: &DateTime<FixedOffset>) -> Result<ExcelDateTime, AggregatorError> {
    let utc = at.with_timezone(&Utc);
    let year = u16::try_from(utc.year())
        .map_err(|_| AggregatorError::Formatting(format!("year {} out of range", utc.year())))?;
    Ok(ExcelDateTime::from_ymd(year, utc.month() as u8, utc.day() as u8)?.and_hms(
        utc.hour() as u16,
        utc.minute() as u8,
        utc.second() as f64,
    )?)
}

/// Serialize records and metadata into an in-memory `.xlsx` buffer.
pub fn format_workbook(
    records: &[JobRecord],
    meta: &ExportMetadata,
) -> Result<Vec<u8>, AggregatorError> {
    let bold = Format::new().set_bold();
    let mut workbook = Workbook::new();
    let created = creation_time(&meta.generated_at)?;
    workbook.set_properties(&DocProperties::new().set_creation_datetime(&created));

    let mut jobs = Worksheet::new();
    jobs.set_name("Jobs")?;
    for (col, (title, width)) in COLUMNS.iter().enumerate() {
        let col = col as u16;
        jobs.write_string_with_format(0, col, *title, &bold)?;
        jobs.set_column_width(col, *width)?;
    }
    jobs.set_freeze_panes(1, 0)?;

    for (i, rec) in records.iter().enumerate() {
        let row = u32::try_from(i + 1)
            .map_err(|_| AggregatorError::Formatting(format!("row index {i} out of range")))?;
        for (col, value) in export_row(rec).iter().enumerate() {
            jobs.write_string(row, col as u16, clip(value))?;
        }
    }
    workbook.push_worksheet(jobs);

    let mut audit = Worksheet::new();
    audit.set_name("Metadata")?;
    audit.set_column_width(0, 22)?;
    audit.set_column_width(1, 40)?;
    audit.set_column_width(2, 50)?;

    let summary = [
        ("Credential Used", meta.credential.clone()),
        ("Generated At", meta.generated_at.to_rfc3339()),
        ("Total Jobs", records.len().to_string()),
    ];
    for (row, (label, value)) in summary.iter().enumerate() {
        audit.write_string_with_format(row as u32, 0, *label, &bold)?;
        audit.write_string(row as u32, 1, value)?;
    }

    let header_row = summary.len() as u32 + 1;
    for (col, label) in ["Source", "Jobs", "Error"].iter().enumerate() {
        audit.write_string_with_format(header_row, col as u16, *label, &bold)?;
    }
    for (i, s) in meta.sources.iter().enumerate() {
        let row = header_row + 1 + i as u32;
        audit.write_string(row, 0, &s.name)?;
        audit.write_number(row, 1, s.records as f64)?;
        audit.write_string(row, 2, s.error.as_deref().unwrap_or(""))?;
    }
    workbook.push_worksheet(audit);

    Ok(workbook.save_to_buffer()?)
}
