use validator::Validate;

use crate::{ServiceError, ServiceResult, contact::Contact};

/// Characters that cannot be stored in a record-file field.
pub const RECORD_DELIMITERS: [char; 4] = [',', '"', '\r', '\n'];

#[derive(Validate)]
struct RequiredFieldsValidator {
    #[validate(length(min = 1, message = "first_name must not be empty"))]
    first_name: String,
    #[validate(length(min = 1, message = "email must not be empty"))]
    email: String,
}

/// Checks everything a contact needs before it may be written to the record file.
pub fn validate_contact(contact: &Contact) -> ServiceResult<()> {
    let validator = RequiredFieldsValidator {
        first_name: contact.first_name.clone(),
        email: contact.email.clone(),
    };
    if let Err(e) = validator.validate() {
        return ServiceError::bad_request(format!("Missing required field: {}", e));
    }
    for (name, value) in contact.fields() {
        validate_record_field(name, value)?;
    }
    Ok(())
}

pub fn validate_record_field(name: &str, value: &str) -> ServiceResult<()> {
    if let Some(c) = value.chars().find(|c| RECORD_DELIMITERS.contains(c)) {
        return ServiceError::bad_request(format!(
            "Field '{}' contains unsupported character {:?}",
            name, c
        ));
    }
    Ok(())
}
