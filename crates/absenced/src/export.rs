//! Attendance spreadsheet export.

use absence_store::models::datetime;
use absence_store::ExportRow;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const SHEET_NAME: &str = "Attendance";

const COLUMNS: [(&str, f64); 9] = [
    ("Session ID", 11.0),
    ("Group ID", 9.0),
    ("Start", 20.0),
    ("End", 20.0),
    ("Student ID", 11.0),
    ("First name", 18.0),
    ("Last name", 18.0),
    ("Email", 30.0),
    ("Status", 10.0),
];

/// Render one row per (session, student) into an in-memory .xlsx file.
pub fn attendance_workbook(rows: &[ExportRow]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let header = Format::new().set_bold();
    for (col, (title, width)) in COLUMNS.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *title, &header)?;
        sheet.set_column_width(col, *width)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_number(r, 0, row.session_id as f64)?;
        sheet.write_number(r, 1, row.group_id as f64)?;
        sheet.write_string(r, 2, row.start_time.format(datetime::FORMAT).to_string())?;
        sheet.write_string(r, 3, row.end_time.format(datetime::FORMAT).to_string())?;
        sheet.write_number(r, 4, row.student_id as f64)?;
        sheet.write_string(r, 5, row.first_name.as_str())?;
        sheet.write_string(r, 6, row.last_name.as_str())?;
        sheet.write_string(r, 7, row.email.as_str())?;
        sheet.write_string(r, 8, row.status.as_str())?;
    }

    workbook.save_to_buffer()
}

/// Download name for an export scoped to a session or to a whole group.
pub fn export_filename(session_id: Option<i64>, group_id: Option<i64>) -> String {
    match (session_id, group_id) {
        (Some(id), _) => format!("attendance_session_{id}.xlsx"),
        (None, Some(id)) => format!("attendance_group_{id}.xlsx"),
        (None, None) => "attendance.xlsx".to_string(),
    }
}
