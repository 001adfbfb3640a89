use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The ten class levels offered by the school. Every record carrying a
/// class label must use one of these values verbatim.
pub const CLASS_LEVELS: [&str; 10] = [
    "Nursery", "LKG", "UKG", "Class 1", "Class 2", "Class 3", "Class 4", "Class 5", "Class 6",
    "Class 7",
];

/// Subjects available for homework and test results.
pub const SUBJECTS: [&str; 8] = [
    "English",
    "Hindi",
    "Mathematics",
    "Science",
    "Social Studies",
    "Computer",
    "General Knowledge",
    "Drawing",
];

pub fn is_valid_class(label: &str) -> bool {
    CLASS_LEVELS.contains(&label)
}

pub fn is_valid_subject(subject: &str) -> bool {
    SUBJECTS.contains(&subject)
}

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attendance_status", rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
        }
    }
}

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "fee_type", rename_all = "snake_case")]
pub enum FeeType {
    Tuition,
    Transport,
    Books,
    Uniform,
    Other,
}

impl FeeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeType::Tuition => "tuition",
            FeeType::Transport => "transport",
            FeeType::Books => "books",
            FeeType::Uniform => "uniform",
            FeeType::Other => "other",
        }
    }
}

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "fee_status", rename_all = "snake_case")]
pub enum FeeStatus {
    Pending,
    Paid,
    Partial,
}

impl FeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeStatus::Pending => "pending",
            FeeStatus::Paid => "paid",
            FeeStatus::Partial => "partial",
        }
    }
}

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "notice_priority", rename_all = "snake_case")]
pub enum NoticePriority {
    High,
    Medium,
    Low,
}

impl NoticePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticePriority::High => "high",
            NoticePriority::Medium => "medium",
            NoticePriority::Low => "low",
        }
    }
}

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "notice_audience", rename_all = "snake_case")]
pub enum NoticeAudience {
    All,
    Students,
    Parents,
    Teachers,
}

impl NoticeAudience {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeAudience::All => "all",
            NoticeAudience::Students => "students",
            NoticeAudience::Parents => "parents",
            NoticeAudience::Teachers => "teachers",
        }
    }
}

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "notice_status", rename_all = "snake_case")]
pub enum NoticeStatus {
    Active,
    Inactive,
}

impl NoticeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeStatus::Active => "active",
            NoticeStatus::Inactive => "inactive",
        }
    }
}

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "inquiry_status", rename_all = "snake_case")]
pub enum InquiryStatus {
    New,
    Responded,
    Resolved,
}

impl InquiryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryStatus::New => "new",
            InquiryStatus::Responded => "responded",
            InquiryStatus::Resolved => "resolved",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Student {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub class_label: String,
    pub date_of_birth: NaiveDate,
    pub email: String,
    pub parent_name: String,
    pub parent_phone: String,
    pub address: String,
    pub parent_user_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct AttendanceRecord {
    pub id: i32,
    pub date: NaiveDate,
    pub class_label: String,
    pub student_id: Option<i32>,
    pub student_name: String,
    pub status: AttendanceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct FeeRecord {
    pub id: i32,
    pub student_id: Option<i32>,
    pub student_name: String,
    pub fee_type: FeeType,
    pub amount: i32,
    pub due_date: NaiveDate,
    pub status: FeeStatus,
    pub payment_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct HomeworkAssignment {
    pub id: i32,
    pub title: String,
    pub subject: String,
    pub class_label: String,
    pub description: String,
    pub assigned_date: NaiveDate,
    pub due_date: NaiveDate,
    pub assigned_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Notice {
    pub id: i32,
    pub title: String,
    pub priority: NoticePriority,
    pub audience: NoticeAudience,
    pub content: String,
    pub expiry_date: Option<NaiveDate>,
    pub status: NoticeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct TestResult {
    pub id: i32,
    pub student_id: Option<i32>,
    pub student_name: String,
    pub subject: String,
    pub test_type: String,
    pub test_date: NaiveDate,
    pub marks_obtained: i32,
    pub total_marks: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Inquiry {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub message: String,
    pub status: InquiryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct WaitlistEntry {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub status: String,
    pub source: String,
    pub visible: bool,
    pub user_agent: Option<String>,
    pub submitted_on: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_levels_are_fixed() {
        assert_eq!(CLASS_LEVELS.len(), 10);
        assert!(is_valid_class("Nursery"));
        assert!(is_valid_class("Class 7"));
        assert!(!is_valid_class("Class 8"));
        assert!(!is_valid_class("class 1"));
    }

    #[test]
    fn subject_list_is_fixed() {
        assert!(is_valid_subject("Mathematics"));
        assert!(!is_valid_subject("Alchemy"));
    }

    #[test]
    fn enums_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&FeeStatus::Paid).unwrap(),
            "\"paid\""
        );
        assert_eq!(
            serde_json::to_string(&NoticeAudience::Parents).unwrap(),
            "\"parents\""
        );
        let status: InquiryStatus = serde_json::from_str("\"responded\"").unwrap();
        assert_eq!(status, InquiryStatus::Responded);
    }
}
