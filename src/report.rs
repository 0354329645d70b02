use std::fs;
use std::path::{Path, PathBuf};
use umya_spreadsheet::{new_file, writer};
use crate::attendance::{attendance_percentage, totals, ReportMonth};
use crate::models::{AttendanceRow, UserType};

fn col_to_letter(col: usize) -> String {
    // 1-based, A..Z is enough for the report's columns
    ((b'A' + (col as u8) - 1) as char).to_string()
}

pub fn attendance_report_filename(user_type: UserType, month: ReportMonth) -> String {
    format!("attendance_{}_{}-{:02}.xlsx", user_type, month.year, month.month)
}

/// Writes the monthly attendance table to `<reports_dir>/attendance_<type>_<yyyy-mm>.xlsx`.
pub fn write_attendance_excel(
    rows: &[AttendanceRow],
    user_type: UserType,
    month: ReportMonth,
    reports_dir: &Path,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if !reports_dir.exists() {
        fs::create_dir_all(reports_dir)?;
    }
    let output_path = reports_dir.join(attendance_report_filename(user_type, month));

    let mut book = new_file();
    let sheet = book
        .get_sheet_by_name_mut("Sheet1")
        .ok_or("workbook has no default sheet")?;

    sheet.get_cell_mut("A1").set_value(format!("Monthly attendance ({})", user_type));
    sheet.get_cell_mut("A2").set_value(month.label());

    let headers = ["Name", "Present", "Absent", "Late", "Leave", "Working days", "Attendance %"];
    for (i, header) in headers.iter().enumerate() {
        let cell_address = format!("{}4", col_to_letter(i + 1));
        sheet.get_cell_mut(&*cell_address).set_value(*header);
    }

    for (i, row) in rows.iter().enumerate() {
        let line = i + 5;
        let values = [
            row.name.clone(),
            row.present.to_string(),
            row.absent.to_string(),
            row.late.to_string(),
            row.leave.to_string(),
            row.total_days.to_string(),
            attendance_percentage(row).map(|p| format!("{:.1}", p)).unwrap_or_default(),
        ];
        for (j, value) in values.iter().enumerate() {
            let cell_address = format!("{}{}", col_to_letter(j + 1), line);
            sheet.get_cell_mut(&*cell_address).set_value(value);
        }
    }

    let summary = totals(rows);
    let line = rows.len() + 6;
    sheet.get_cell_mut(&*format!("A{}", line)).set_value("Total");
    sheet.get_cell_mut(&*format!("B{}", line)).set_value(summary.present.to_string());
    sheet.get_cell_mut(&*format!("C{}", line)).set_value(summary.absent.to_string());
    sheet.get_cell_mut(&*format!("D{}", line)).set_value(summary.late.to_string());
    sheet.get_cell_mut(&*format!("E{}", line)).set_value(summary.leave.to_string());
    if let Some(avg) = summary.average_percentage {
        sheet.get_cell_mut(&*format!("G{}", line)).set_value(format!("{:.1}", avg));
    }

    writer::xlsx::write(&book, &output_path)?;
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Id;

    #[test]
    fn filename_is_stable_per_month() {
        let month = ReportMonth { year: 2025, month: 3 };
        assert_eq!(
            attendance_report_filename(UserType::Teacher, month),
            "attendance_teacher_2025-03.xlsx"
        );
    }

    #[test]
    fn columns_map_to_letters() {
        assert_eq!(col_to_letter(1), "A");
        assert_eq!(col_to_letter(7), "G");
    }

    #[test]
    fn report_is_written() {
        let dir = std::env::temp_dir().join(format!("erp_desk_reports_{}", std::process::id()));
        let rows = vec![AttendanceRow {
            user_id: Id::from("1"),
            name: "Asha".into(),
            present: 20,
            absent: 1,
            late: 1,
            leave: 0,
            total_days: 22,
        }];
        let path = write_attendance_excel(&rows, UserType::Student, ReportMonth { year: 2025, month: 1 }, &dir)
            .unwrap();
        assert!(path.exists());
        let _ = fs::remove_dir_all(dir);
    }
}
