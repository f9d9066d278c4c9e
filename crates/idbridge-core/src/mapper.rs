//! Field mapper and payload validator
//!
//! Translates an [`IdentityRecord`] into the directory's user payload shape,
//! enforcing the remote side's field constraints before any network call.
//! A payload that fails validation here never reaches the directory client,
//! and the error message names the field and the accepted bounds.

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{DomainError, IdentityRecord};

/// Maximum length the directory accepts for free-text profile fields
pub const MAX_JOB_TITLE_LEN: usize = 128;

/// Maximum length the directory accepts for the department field
pub const MAX_DEPARTMENT_LEN: usize = 64;

// ============================================================================
// Payload types
// ============================================================================

/// Password profile sent on user creation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordProfile {
    /// Generated temporary password
    pub password: String,
    /// The user must change the password on first sign-in
    pub force_change_password_next_sign_in: bool,
}

/// Directory user payload (Graph-style JSON body)
///
/// Create requests carry the full shape including `userPrincipalName`,
/// `mailNickname`, and `passwordProfile`; update requests carry only the
/// mutable profile fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUserPayload {
    /// Whether the directory account is enabled
    pub account_enabled: bool,
    /// Full display name
    pub display_name: String,
    /// Principal name, unique per tenant (create only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_principal_name: Option<String>,
    /// Username portion before the @ (create only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_nickname: Option<String>,
    /// Given name
    pub given_name: String,
    /// Surname
    pub surname: String,
    /// Job title (1-128 chars when present)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    /// Department name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// Initial password (create only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_profile: Option<PasswordProfile>,
}

// ============================================================================
// Mapping
// ============================================================================

/// Builds the create payload for a record, embedding the given temporary
/// password
///
/// # Errors
/// Returns `DomainError::Validation` if any field violates the directory's
/// constraints; no network call is made for such records
pub fn build_create_payload(
    record: &IdentityRecord,
    password: &str,
) -> Result<DirectoryUserPayload, DomainError> {
    let (job_title, department) = validate_profile_fields(record)?;

    Ok(DirectoryUserPayload {
        account_enabled: record.active,
        display_name: validated_display_name(record)?,
        user_principal_name: Some(record.email.as_str().to_string()),
        mail_nickname: Some(record.email.local_part().to_string()),
        given_name: record.first_name.clone(),
        surname: record.last_name.clone(),
        job_title,
        department,
        password_profile: Some(PasswordProfile {
            password: password.to_string(),
            force_change_password_next_sign_in: true,
        }),
    })
}

/// Builds the update payload for a record (mutable profile fields only)
///
/// # Errors
/// Returns `DomainError::Validation` on constraint violations
pub fn build_update_payload(record: &IdentityRecord) -> Result<DirectoryUserPayload, DomainError> {
    let (job_title, department) = validate_profile_fields(record)?;

    Ok(DirectoryUserPayload {
        account_enabled: record.active,
        display_name: validated_display_name(record)?,
        user_principal_name: None,
        mail_nickname: None,
        given_name: record.first_name.clone(),
        surname: record.last_name.clone(),
        job_title,
        department,
        password_profile: None,
    })
}

fn validated_display_name(record: &IdentityRecord) -> Result<String, DomainError> {
    let display_name = record.display_name();
    if display_name.is_empty() {
        return Err(DomainError::Validation(
            "display name is empty — set a first or last name".to_string(),
        ));
    }
    Ok(display_name)
}

/// Validates and normalizes the optional profile fields
///
/// A present-but-blank job title is rejected rather than silently dropped:
/// the operator set the field, so an empty value is a data error they need
/// to see.
fn validate_profile_fields(
    record: &IdentityRecord,
) -> Result<(Option<String>, Option<String>), DomainError> {
    let job_title = match &record.job_title {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(DomainError::Validation(format!(
                    "job title is empty — add 1–{MAX_JOB_TITLE_LEN} characters or clear the field"
                )));
            }
            if trimmed.len() > MAX_JOB_TITLE_LEN {
                return Err(DomainError::Validation(format!(
                    "job title is {} characters — the directory accepts at most {MAX_JOB_TITLE_LEN}",
                    trimmed.len()
                )));
            }
            Some(trimmed.to_string())
        }
        None => None,
    };

    let department = match &record.department {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                None
            } else if trimmed.len() > MAX_DEPARTMENT_LEN {
                return Err(DomainError::Validation(format!(
                    "department is {} characters — the directory accepts at most {MAX_DEPARTMENT_LEN}",
                    trimmed.len()
                )));
            } else {
                Some(trimmed.to_string())
            }
        }
        None => None,
    };

    Ok((job_title, department))
}

// ============================================================================
// Password generation
// ============================================================================

/// Alphabet accepted by the directory's password complexity policy
const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

/// Generates a temporary password meeting the directory's complexity rules
///
/// Draws randomness from v4 UUIDs and guarantees at least one lowercase
/// letter, one uppercase letter, and one digit. The password is returned to
/// the caller once and never persisted.
pub fn generate_temp_password(length: usize) -> String {
    let length = length.max(8);

    let mut bytes = Vec::with_capacity(length);
    while bytes.len() < length {
        bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    }
    bytes.truncate(length);

    let mut password: Vec<u8> = bytes
        .iter()
        .map(|b| PASSWORD_ALPHABET[*b as usize % PASSWORD_ALPHABET.len()])
        .collect();

    // Guarantee one character from each required class
    let seed = Uuid::new_v4();
    let seed_bytes = seed.as_bytes();
    if !password.iter().any(u8::is_ascii_lowercase) {
        password[0] = b'a' + seed_bytes[0] % 26;
    }
    if !password.iter().any(u8::is_ascii_uppercase) {
        password[1] = b'A' + seed_bytes[1] % 26;
    }
    if !password.iter().any(u8::is_ascii_digit) {
        password[2] = b'0' + seed_bytes[2] % 10;
    }

    String::from_utf8(password).unwrap_or_else(|_| seed.simple().to_string())
}
