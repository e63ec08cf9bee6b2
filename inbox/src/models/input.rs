//! Input DTOs with garde validation.
//!
//! These structs validate data coming from the dashboard or the CLI before
//! it reaches the store or the message source.

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::error::InboxError;
use crate::utils::validation::{validate_name, validate_user_id, MAX_NAME_LENGTH, MAX_USER_ID_LENGTH};

/// Validation constants
const MAX_MESSAGE_LENGTH: usize = 10000;

/// Custom validation for ids that must normalize to a `UserId`
fn user_id(value: &str, _ctx: &()) -> garde::Result {
    validate_user_id(value)
        .map(|_| ())
        .map_err(|e| garde::Error::new(e))
}

/// Custom validation for profile names
fn person_name(value: &str, _ctx: &()) -> garde::Result {
    validate_name(value).map_err(|e| garde::Error::new(e))
}

/// Message bodies must contain something besides whitespace
fn non_blank(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        Err(garde::Error::new("Message cannot be blank"))
    } else {
        Ok(())
    }
}

/// Input for sending a direct message
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[garde(context(()))]
pub struct SendMessageInput {
    #[garde(length(chars, min = 1, max = MAX_USER_ID_LENGTH), custom(user_id))]
    pub recipient_id: String,
    #[garde(length(chars, min = 1, max = MAX_MESSAGE_LENGTH), custom(non_blank))]
    pub content: String,
}

/// Input for marking a whole conversation as read
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[garde(context(()))]
pub struct MarkAsReadInput {
    #[garde(length(chars, min = 1, max = MAX_USER_ID_LENGTH), custom(user_id))]
    pub counterpart_id: String,
}

/// Input for registering a user profile in the local store
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[garde(context(()))]
pub struct NewUserInput {
    #[garde(length(chars, min = 1, max = MAX_USER_ID_LENGTH), custom(user_id))]
    pub id: String,
    #[garde(length(chars, min = 1, max = MAX_NAME_LENGTH), custom(person_name))]
    pub first_name: String,
    #[garde(length(chars, min = 1, max = MAX_NAME_LENGTH), custom(person_name))]
    pub last_name: String,
}

/// Helper trait to convert garde validation errors into `InboxError`
pub trait ValidateExt {
    fn validate_input(&self) -> Result<(), InboxError>;
}

impl<T: Validate<Context = ()>> ValidateExt for T {
    fn validate_input(&self) -> Result<(), InboxError> {
        self.validate()
            .map_err(|e| InboxError::Validation(e.to_string()))
    }
}
