use chrono::NaiveDate;
use crate::models::AttendanceRow;

/// Calendar month a report is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportMonth {
    pub year: i32,
    pub month: u32,
}

impl ReportMonth {
    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn label(self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| format!("{:02}/{}", self.month, self.year))
    }
}

/// Share of working days attended; late arrivals count as attended.
pub fn attendance_percentage(row: &AttendanceRow) -> Option<f64> {
    if row.total_days == 0 {
        return None;
    }
    let attended = (row.present + row.late) as f64;
    Some((attended / row.total_days as f64 * 1000.0).round() / 10.0)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTotals {
    pub users: usize,
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub leave: u32,
    pub average_percentage: Option<f64>,
}

pub fn totals(rows: &[AttendanceRow]) -> ReportTotals {
    let percentages: Vec<f64> = rows.iter().filter_map(attendance_percentage).collect();
    let average_percentage = (!percentages.is_empty()).then(|| {
        let avg = percentages.iter().sum::<f64>() / percentages.len() as f64;
        (avg * 10.0).round() / 10.0
    });
    ReportTotals {
        users: rows.len(),
        present: rows.iter().map(|r| r.present).sum(),
        absent: rows.iter().map(|r| r.absent).sum(),
        late: rows.iter().map(|r| r.late).sum(),
        leave: rows.iter().map(|r| r.leave).sum(),
        average_percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Id;

    fn row(present: u32, late: u32, absent: u32, total: u32) -> AttendanceRow {
        AttendanceRow {
            user_id: Id::from("u"),
            name: "U".into(),
            present,
            absent,
            late,
            leave: 0,
            total_days: total,
        }
    }

    #[test]
    fn percentage_counts_late_as_attended() {
        assert_eq!(attendance_percentage(&row(18, 2, 2, 22)), Some(90.9));
        assert_eq!(attendance_percentage(&row(0, 0, 0, 0)), None);
    }

    #[test]
    fn totals_average_only_rows_with_days() {
        let t = totals(&[row(10, 0, 10, 20), row(20, 0, 0, 20), row(0, 0, 0, 0)]);
        assert_eq!(t.users, 3);
        assert_eq!(t.present, 30);
        assert_eq!(t.average_percentage, Some(75.0));
    }

    #[test]
    fn month_navigation_wraps_years() {
        let jan = ReportMonth { year: 2025, month: 1 };
        assert_eq!(jan.previous(), ReportMonth { year: 2024, month: 12 });
        assert_eq!(jan.previous().next(), jan);
        assert_eq!(jan.label(), "January 2025");
    }
}
