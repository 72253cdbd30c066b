//! Plain-text tables for terminal output

use std::fmt::Write;

use search::{
    PatientSearchResult, PaymentSearchResult, SearchResultPage, VaccinationSearchResult,
};

use crate::devices::Device;
use crate::users::StaffUser;

/// A value that renders as one table row
pub trait TableRow {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<String>;
}

impl TableRow for PatientSearchResult {
    const HEADERS: &'static [&'static str] =
        &["ID", "NAME", "PHONE", "AGE", "SEX", "TYPE", "STATUS", "CREATED"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.phone.clone(),
            self.age.to_string(),
            self.sex.to_string(),
            self.patient_type.to_string(),
            self.status.to_string(),
            short_timestamp(&self.created_at),
        ]
    }
}

impl TableRow for VaccinationSearchResult {
    const HEADERS: &'static [&'static str] =
        &["ID", "PATIENT", "PHONE", "VACCINE", "DOSE", "DATE", "BATCH", "PRICE"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.patient_name.clone(),
            self.patient_phone.clone(),
            self.vaccine_name.clone(),
            self.dose_number.to_string(),
            self.dose_date.to_string(),
            self.batch_number.clone(),
            format!("{:.2}", self.vaccine_price),
        ]
    }
}

impl TableRow for PaymentSearchResult {
    const HEADERS: &'static [&'static str] =
        &["ID", "PATIENT", "PHONE", "VACCINE", "AMOUNT", "DATE", "METHOD", "REFERENCE"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.patient_name.clone(),
            self.patient_phone.clone(),
            self.vaccine_name.clone(),
            format!("{:.2}", self.amount),
            self.payment_date.to_string(),
            optional(&self.payment_method),
            optional(&self.reference_number),
        ]
    }
}

impl TableRow for StaffUser {
    const HEADERS: &'static [&'static str] =
        &["ID", "USERNAME", "EMAIL", "NAME", "ROLE", "ACTIVE", "CREATED"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.username.clone(),
            self.email.clone(),
            optional(&self.full_name),
            self.role.as_str().to_string(),
            if self.is_active { "yes" } else { "no" }.to_string(),
            short_timestamp(&self.created_at),
        ]
    }
}

impl TableRow for Device {
    const HEADERS: &'static [&'static str] =
        &["ID", "USER", "DEVICE", "FINGERPRINT", "STATUS", "LAST SEEN"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.username.clone(),
            self.device_name.clone(),
            self.fingerprint.clone(),
            self.status.to_string(),
            self.last_seen_at
                .as_deref()
                .map(short_timestamp)
                .unwrap_or_else(|| "-".to_string()),
        ]
    }
}

fn optional(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

/// "2024-06-01T12:00:00Z" -> "2024-06-01 12:00"
fn short_timestamp(value: &str) -> String {
    match value.get(..16) {
        Some(prefix) if value.as_bytes().get(10) == Some(&b'T') => prefix.replacen('T', " ", 1),
        _ => value.to_string(),
    }
}

/// Render rows as a left-aligned table
pub fn table<T: TableRow>(rows: &[T]) -> String {
    let body: Vec<Vec<String>> = rows.iter().map(|row| row.cells()).collect();

    let mut widths: Vec<usize> = T::HEADERS.iter().map(|h| h.chars().count()).collect();
    for row in &body {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let headers: Vec<String> = T::HEADERS.iter().map(|h| h.to_string()).collect();
    push_line(&mut out, &headers, &widths);
    for row in &body {
        push_line(&mut out, row, &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

/// "page X of Y, N results" plus total amount and query time when reported
pub fn page_footer<T>(page: &SearchResultPage<T>) -> String {
    let mut footer = format!(
        "page {} of {}, {} result{}",
        page.page,
        page.total_pages,
        page.total_count,
        if page.total_count == 1 { "" } else { "s" }
    );
    if let Some(total) = page.total_amount {
        let _ = write!(footer, ", total amount {:.2}", total);
    }
    if let Some(ms) = page.query_time_ms {
        let _ = write!(footer, " ({:.1} ms)", ms);
    }
    footer
}

/// Table and footer for a search page
pub fn search_page<T: TableRow>(page: &SearchResultPage<T>) -> String {
    if page.is_empty() {
        return format!("No results\n{}\n", page_footer(page));
    }
    format!("{}{}\n", table(&page.items), page_footer(page))
}
