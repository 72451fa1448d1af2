use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Status of a scheduled job (an on-site intervention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[sqlx(rename = "todo")]
    Todo,
    #[sqlx(rename = "in_progress")]
    InProgress,
    #[sqlx(rename = "completed")]
    Completed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Todo => write!(f, "todo"),
            JobStatus::InProgress => write!(f, "in_progress"),
            JobStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Job model, maps to the `jobs` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,

    /// Owning tenant
    pub tenant_id: Uuid,

    pub client_id: Option<Uuid>,

    pub title: String,

    /// When the job is planned; only the calendar date matters for status rules
    pub scheduled_at: DateTime<Utc>,

    pub status: JobStatus,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Job creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateJob {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,

    pub client_id: Option<Uuid>,

    pub scheduled_at: DateTime<Utc>,

    pub notes: Option<String>,
}

/// Job status update request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateJobStatus {
    pub status: JobStatus,
}
