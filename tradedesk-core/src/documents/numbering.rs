//! Human-readable document numbers (`DEV-000001`, `FAC-000042`).
//!
//! Sequences are per tenant and per kind, derived from the largest suffix
//! already in use. Numbers are also unique across tenants, so a candidate
//! taken by another tenant is skipped.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::DocumentKind;
use crate::store::{DocumentStore, Store};

/// Upper bound on candidates tried before giving up.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 1000;

static NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(DEV|FAC)-(\d+)$").expect("number pattern is valid"));

/// Numeric suffix of `number` when it is a well-formed number of `kind`.
pub fn parse_suffix(kind: DocumentKind, number: &str) -> Option<u64> {
    let captures = NUMBER_PATTERN.captures(number)?;
    if &captures[1] != kind.prefix() {
        return None;
    }
    captures[2].parse().ok()
}

/// `max(existing suffixes) + 1`, or 1 when none parse.
pub fn next_suffix<S: AsRef<str>>(kind: DocumentKind, existing: &[S]) -> u64 {
    existing
        .iter()
        .filter_map(|number| parse_suffix(kind, number.as_ref()))
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

/// Formats `suffix` with the kind's prefix, zero-padded to six digits.
pub fn format_number(kind: DocumentKind, suffix: u64) -> String {
    format!("{}-{:06}", kind.prefix(), suffix)
}

/// Allocates the next free number for `tenant_id`.
///
/// The result is only a candidate: two concurrent allocations may agree on
/// it, in which case the unique constraint rejects the second insert and the
/// caller allocates again.
pub async fn allocate(store: &dyn Store, kind: DocumentKind, tenant_id: Uuid) -> Result<String, AppError> {
    let existing = store.tenant_numbers(tenant_id, kind).await?;
    let mut suffix = next_suffix(kind, &existing);

    for _ in 0..MAX_ALLOCATION_ATTEMPTS {
        let candidate = format_number(kind, suffix);
        if !store.number_exists(&candidate).await? {
            debug!(%tenant_id, number = %candidate, "Allocated document number");
            return Ok(candidate);
        }
        suffix = suffix.saturating_add(1);
    }

    warn!(%tenant_id, %kind, "No free document number after {} candidates", MAX_ALLOCATION_ATTEMPTS);
    Err(AppError::SequencingExhausted(kind))
}
