use crate::models::FeeStructure;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Total payable for a fee structure over the whole course.
///
/// Transport and hostel are monthly charges and only count when the
/// structure has them enabled.
pub fn calculate_total_fee(fee: &FeeStructure) -> f64 {
    let months = fee.course_duration_months as f64;
    let mut total = fee.admission_fee + fee.registration_fee + fee.examination_fee;
    if fee.has_transport {
        total += fee.transport_fee * months;
    }
    if fee.has_hostel {
        total += fee.hostel_fee * months;
    }
    round2(total)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeLine {
    pub label: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeBreakdown {
    pub lines: Vec<FeeLine>,
    pub total: f64,
}

pub fn breakdown(fee: &FeeStructure) -> FeeBreakdown {
    let months = fee.course_duration_months;
    let mut lines = vec![
        FeeLine { label: "Admission".into(), amount: fee.admission_fee },
        FeeLine { label: "Registration".into(), amount: fee.registration_fee },
        FeeLine { label: "Examination".into(), amount: fee.examination_fee },
    ];
    if fee.has_transport {
        lines.push(FeeLine {
            label: format!("Transport ({} x {} months)", fee.transport_fee, months),
            amount: round2(fee.transport_fee * months as f64),
        });
    }
    if fee.has_hostel {
        lines.push(FeeLine {
            label: format!("Hostel ({} x {} months)", fee.hostel_fee, months),
            amount: round2(fee.hostel_fee * months as f64),
        });
    }
    FeeBreakdown { lines, total: calculate_total_fee(fee) }
}

/// One-line text used in the student table's fee column.
pub fn fee_summary(fee: &FeeStructure, currency: &str) -> String {
    let name = if fee.name.trim().is_empty() { "Fee structure" } else { fee.name.as_str() };
    format!("{}: {}{:.2}", name, currency, calculate_total_fee(fee))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Id;

    fn sample() -> FeeStructure {
        FeeStructure {
            id: Id::from("1"),
            name: "Regular".into(),
            admission_fee: 500.0,
            registration_fee: 200.0,
            examination_fee: 100.0,
            has_transport: true,
            transport_fee: 50.0,
            has_hostel: false,
            hostel_fee: 0.0,
            course_duration_months: 6,
            ..FeeStructure::default()
        }
    }

    #[test]
    fn total_includes_enabled_monthly_charges() {
        assert_eq!(calculate_total_fee(&sample()), 1100.00);
    }

    #[test]
    fn disabled_charges_are_ignored_even_when_priced() {
        let fee = FeeStructure { has_transport: false, hostel_fee: 300.0, ..sample() };
        assert_eq!(calculate_total_fee(&fee), 800.00);
    }

    #[test]
    fn total_is_rounded_to_cents() {
        let fee = FeeStructure {
            admission_fee: 0.1,
            registration_fee: 0.2,
            examination_fee: 0.0,
            has_transport: false,
            ..sample()
        };
        assert_eq!(calculate_total_fee(&fee), 0.3);
    }

    #[test]
    fn breakdown_lists_monthly_lines() {
        let b = breakdown(&FeeStructure { has_hostel: true, hostel_fee: 100.0, ..sample() });
        assert_eq!(b.lines.len(), 5);
        assert_eq!(b.lines[4].amount, 600.0);
        assert_eq!(b.total, 1700.0);
    }

    #[test]
    fn summary_uses_currency_symbol() {
        assert_eq!(fee_summary(&sample(), "₹"), "Regular: ₹1100.00");
    }
}
