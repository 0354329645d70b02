use std::fmt;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// Opaque record id. The backend sends numeric ids for some tables and
/// UUID strings for others, so both decode into the same text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Id(pub String);

impl Id {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id(value.to_string())
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl<'de> Visitor<'de> for IdVisitor {
            type Value = Id;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string or integer id")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Id, E> {
                Ok(Id(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Id, E> {
                Ok(Id(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Id, E> {
                Ok(Id(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Money and mark columns arrive as JSON numbers or as numeric strings ("500.00").
fn flexible_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(flexible_opt_f64(deserializer)?.unwrap_or(0.0))
}

fn flexible_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Text(String),
        Null,
    }
    match Option::<Raw>::deserialize(deserializer)? {
        None | Some(Raw::Null) => Ok(None),
        Some(Raw::Num(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
    }
}

fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Num(i64),
        Text(String),
        Null,
    }
    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Bool(b)) => b,
        Some(Raw::Num(n)) => n != 0,
        Some(Raw::Text(s)) => matches!(s.as_str(), "true" | "1" | "yes"),
        Some(Raw::Null) | None => false,
    })
}

/// List endpoints answer either with a bare array or with `{ "data": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(data) => data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Student {
    pub id: Id,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub course_id: Option<Id>,
    #[serde(default)]
    pub batch_id: Option<Id>,
    #[serde(default)]
    pub fee_structure_id: Option<Id>,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub batch_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Student {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Body of `PUT /api/students/:id`. `password` is only sent when the user typed one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub course_id: Option<Id>,
    pub batch_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_structure_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Course {
    pub id: Id,
    #[serde(alias = "course_name")]
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub duration_months: Option<u32>,
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({})", self.name, code),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Batch {
    pub id: Id,
    #[serde(alias = "batch_name")]
    pub name: String,
    #[serde(default)]
    pub start_date: Option<String>,
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Subject {
    pub id: Id,
    #[serde(alias = "subject_name")]
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({})", self.name, code),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct FeeStructure {
    pub id: Id,
    #[serde(default, alias = "structure_name")]
    pub name: String,
    #[serde(default)]
    pub course_id: Option<Id>,
    #[serde(default)]
    pub batch_id: Option<Id>,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub admission_fee: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub registration_fee: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub examination_fee: f64,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub has_transport: bool,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub transport_fee: f64,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub has_hostel: bool,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub hostel_fee: f64,
    #[serde(default)]
    pub course_duration_months: u32,
}

impl fmt::Display for FeeStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.trim().is_empty() {
            write!(f, "Fee structure #{}", self.id)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl FeedbackStatus {
    pub const ALL: &'static [FeedbackStatus] = &[
        FeedbackStatus::Pending,
        FeedbackStatus::Approved,
        FeedbackStatus::Rejected,
    ];
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            FeedbackStatus::Pending => "Pending",
            FeedbackStatus::Approved => "Approved",
            FeedbackStatus::Rejected => "Rejected",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Feedback {
    pub id: Id,
    #[serde(default, alias = "user_name")]
    pub submitted_by: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub status: FeedbackStatus,
    #[serde(default)]
    pub admin_response: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackUpdate {
    pub status: FeedbackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_response: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AttendanceRow {
    pub user_id: Id,
    #[serde(default, alias = "user_name")]
    pub name: String,
    #[serde(default)]
    pub present: u32,
    #[serde(default)]
    pub absent: u32,
    #[serde(default)]
    pub late: u32,
    #[serde(default)]
    pub leave: u32,
    #[serde(default)]
    pub total_days: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Schedule {
    pub id: Id,
    #[serde(default)]
    pub exam_name: String,
    #[serde(default)]
    pub subject_id: Option<Id>,
    #[serde(default)]
    pub subject_name: String,
    #[serde(default)]
    pub course_id: Option<Id>,
    #[serde(default)]
    pub batch_id: Option<Id>,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub batch_name: Option<String>,
    /// Absent or zero when the exam has no upper bound.
    #[serde(default, deserialize_with = "flexible_opt_f64")]
    pub max_marks: Option<f64>,
    #[serde(default, deserialize_with = "flexible_opt_f64")]
    pub pass_marks: Option<f64>,
    #[serde(default)]
    pub exam_date: Option<String>,
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.exam_name, self.subject_name)?;
        if let Some(date) = &self.exam_date {
            write!(f, " ({})", date)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Enrollment {
    pub student_id: Id,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub roll_number: Option<String>,
    #[serde(default, deserialize_with = "flexible_opt_f64")]
    pub marks_obtained: Option<f64>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_absent: bool,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkRecord {
    pub student_id: Id,
    pub marks_obtained: Option<f64>,
    pub is_absent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkMarks {
    pub marks: Vec<MarkRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    #[default]
    Student,
    Teacher,
}

impl UserType {
    pub const ALL: &'static [UserType] = &[UserType::Student, UserType::Teacher];
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            UserType::Student => "student",
            UserType::Teacher => "teacher",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAttendanceQuery {
    pub user_type: UserType,
    pub year: i32,
    pub month: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Id>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivationRequest {
    pub email: String,
    pub activation_token: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginUser {
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub student_id: Option<Id>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<LoginUser>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub active_session_id: Option<Id>,
    #[serde(default, alias = "branch_id")]
    pub active_branch_id: Option<Id>,
}

impl LoginResponse {
    pub fn role(&self) -> String {
        self.user
            .as_ref()
            .map(|u| u.role.clone())
            .filter(|r| !r.is_empty())
            .or_else(|| self.role.clone())
            .unwrap_or_else(|| "student".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_accept_numbers_and_strings() {
        let numeric: Id = serde_json::from_str("17").unwrap();
        let text: Id = serde_json::from_str("\"17\"").unwrap();
        assert_eq!(numeric, text);
    }

    #[test]
    fn fee_structure_accepts_numeric_strings() {
        let json = r#"{
            "id": 3, "name": "2024 Regular",
            "admission_fee": "500.00", "registration_fee": 200,
            "examination_fee": "100", "has_transport": 1, "transport_fee": "50",
            "has_hostel": false, "hostel_fee": null, "course_duration_months": 6
        }"#;
        let fee: FeeStructure = serde_json::from_str(json).unwrap();
        assert_eq!(fee.admission_fee, 500.0);
        assert!(fee.has_transport);
        assert_eq!(fee.hostel_fee, 0.0);
        assert_eq!(fee.course_duration_months, 6);
    }

    #[test]
    fn envelope_unwraps_both_shapes() {
        let wrapped: Envelope<Vec<Batch>> =
            serde_json::from_str(r#"{"data":[{"id":1,"batch_name":"Morning"}]}"#).unwrap();
        let bare: Envelope<Vec<Batch>> =
            serde_json::from_str(r#"[{"id":1,"name":"Morning"}]"#).unwrap();
        assert_eq!(wrapped.into_inner(), bare.into_inner());
    }

    #[test]
    fn student_update_omits_absent_password() {
        let update = StudentUpdate {
            first_name: "Asha".into(),
            last_name: "Rao".into(),
            email: "asha@example.com".into(),
            phone: None,
            course_id: Some(Id::from("1")),
            batch_id: Some(Id::from("2")),
            fee_structure_id: None,
            password: None,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert!(json.get("password").is_none());
    }

    #[test]
    fn login_role_prefers_nested_user() {
        let resp: LoginResponse = serde_json::from_str(
            r#"{"token":"t","role":"student","user":{"role":"admin"}}"#,
        )
        .unwrap();
        assert_eq!(resp.role(), "admin");
    }
}
