use chrono::NaiveDate;

use crate::error::AppError;
use crate::models::JobStatus;

/// Checks a status change against the job's scheduled calendar date.
///
/// A job dated before `today` cannot go back to `todo`, and a job dated
/// after `today` cannot be `completed`. Same-day jobs accept any status.
pub fn check_status_change(scheduled_on: NaiveDate, today: NaiveDate, status: JobStatus) -> Result<(), AppError> {
    match status {
        JobStatus::Todo if scheduled_on < today => Err(AppError::field(
            "status",
            "A job scheduled in the past cannot be set to todo",
        )),
        JobStatus::Completed if scheduled_on > today => Err(AppError::field(
            "status",
            "A job scheduled in the future cannot be completed",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    #[test]
    fn test_past_job_cannot_be_todo() {
        assert!(check_status_change(day(9), day(10), JobStatus::Todo).is_err());
        assert!(check_status_change(day(9), day(10), JobStatus::InProgress).is_ok());
        assert!(check_status_change(day(9), day(10), JobStatus::Completed).is_ok());
    }

    #[test]
    fn test_future_job_cannot_be_completed() {
        assert!(check_status_change(day(11), day(10), JobStatus::Completed).is_err());
        assert!(check_status_change(day(11), day(10), JobStatus::Todo).is_ok());
        assert!(check_status_change(day(11), day(10), JobStatus::InProgress).is_ok());
    }

    #[test]
    fn test_same_day_is_unconstrained() {
        for status in [JobStatus::Todo, JobStatus::InProgress, JobStatus::Completed] {
            assert!(check_status_change(day(10), day(10), status).is_ok());
        }
    }

    #[test]
    fn test_rejection_names_status_field() {
        match check_status_change(day(1), day(2), JobStatus::Todo) {
            Err(AppError::Validation(fields)) => assert_eq!(fields[0].field, "status"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
