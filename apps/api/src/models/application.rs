use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::AppError;

pub const DEFAULT_STATUS: &str = "new";

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Request payloads
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStatus {
    #[serde(default = "default_status")]
    pub status: String,
    pub job_title: String,
}

/// Resume metadata. The bytes live in object storage under the key derived
/// from `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFile {
    pub name: String,
    pub size: i64,
    #[serde(rename = "type")]
    pub content_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPersonalInfo {
    pub firstname: String,
    pub lastname: String,
    pub gender: String,
    pub birthdate: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAddressDegree {
    pub zipcode: String,
    #[serde(rename = "stateProvince")]
    pub state_province: String,
    #[serde(rename = "townCity")]
    pub town_city: String,
    pub degree: String,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub program: Option<String>,
    pub institution: String,
}

/// Body of `POST /post`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitApplication {
    pub personal_info: NewPersonalInfo,
    pub address_degree: NewAddressDegree,
    pub status: NewStatus,
    #[serde(default)]
    pub file: Option<NewFile>,
}

/// Body of `PUT /post/:id`. `job_title` is left untouched when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatus {
    pub status: String,
    #[serde(default)]
    pub job_title: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Rows
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StatusRow {
    pub id: i32,
    pub status: String,
    pub job_title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AddressDegreeRow {
    pub id: i32,
    pub zipcode: String,
    #[serde(rename = "stateProvince")]
    pub state_province: String,
    #[serde(rename = "townCity")]
    pub town_city: String,
    pub degree: String,
    pub course: Option<String>,
    pub program: Option<String>,
    pub institution: String,
    pub personal_info_id: i32,
}

/// Flattened view of one application aggregate
/// (status ⋈ personal_info ⋈ address_degree). `id` is the personal_info id
/// and `status_id` is the id `PUT /post/:id` expects.
///
/// The address/degree columns are `None` only for a personal_info row
/// created without its address_degree child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: i32,
    pub status_id: i32,
    pub status: String,
    pub job_title: String,
    pub submitted_at: DateTime<Utc>,
    pub firstname: String,
    pub lastname: String,
    pub gender: String,
    pub birthdate: String,
    pub phone: String,
    pub email: String,
    pub file_id: Option<i32>,
    pub address_degree_id: Option<i32>,
    pub zipcode: Option<String>,
    #[serde(rename = "stateProvince")]
    pub state_province: Option<String>,
    #[serde(rename = "townCity")]
    pub town_city: Option<String>,
    pub degree: Option<String>,
    pub course: Option<String>,
    pub program: Option<String>,
    pub institution: Option<String>,
}

impl Application {
    /// Name used in the confirmation email greeting.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
            .trim()
            .to_string()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

impl SubmitApplication {
    /// Rejects submissions that would store an unusable application.
    /// Collects every problem so the client can fix them in one round trip.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut problems = Vec::new();

        require(&mut problems, "status.status", &self.status.status);
        require(&mut problems, "status.job_title", &self.status.job_title);
        require(&mut problems, "personal_info.firstname", &self.personal_info.firstname);
        require(&mut problems, "personal_info.lastname", &self.personal_info.lastname);
        require(&mut problems, "personal_info.gender", &self.personal_info.gender);
        require(&mut problems, "personal_info.phone", &self.personal_info.phone);
        require(&mut problems, "address_degree.zipcode", &self.address_degree.zipcode);
        require(
            &mut problems,
            "address_degree.stateProvince",
            &self.address_degree.state_province,
        );
        require(
            &mut problems,
            "address_degree.townCity",
            &self.address_degree.town_city,
        );
        require(&mut problems, "address_degree.degree", &self.address_degree.degree);
        require(
            &mut problems,
            "address_degree.institution",
            &self.address_degree.institution,
        );

        let email = self.personal_info.email.trim();
        if email.is_empty() {
            problems.push("personal_info.email is required".to_string());
        } else if email.parse::<lettre::Address>().is_err() {
            problems.push(format!("personal_info.email '{email}' is not a valid address"));
        }

        let birthdate = self.personal_info.birthdate.trim();
        if birthdate.is_empty() {
            problems.push("personal_info.birthdate is required".to_string());
        } else if NaiveDate::parse_from_str(birthdate, "%Y-%m-%d").is_err() {
            problems.push(format!(
                "personal_info.birthdate '{birthdate}' must be formatted as YYYY-MM-DD"
            ));
        }

        if let Some(file) = &self.file {
            require(&mut problems, "file.name", &file.name);
            if file.size < 0 {
                problems.push("file.size must not be negative".to_string());
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(problems.join("; ")))
        }
    }
}

impl UpdateStatus {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.status.trim().is_empty() {
            return Err(AppError::Validation("status is required".to_string()));
        }
        if matches!(&self.job_title, Some(t) if t.trim().is_empty()) {
            return Err(AppError::Validation(
                "job_title must not be blank when provided".to_string(),
            ));
        }
        Ok(())
    }
}

fn require(problems: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        problems.push(format!("{field} is required"));
    }
}
