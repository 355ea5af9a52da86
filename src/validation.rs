use thiserror::Error;

use crate::models::ListingFields;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid listing: {0}")]
    InvalidListing(String),
}

pub fn validate_listing(fields: &ListingFields) -> Result<(), ValidationError> {
    if fields.id.trim().is_empty() {
        return Err(ValidationError::MissingParameter("id".to_string()));
    }

    if let Some(rating) = fields.rating {
        if !(0.0..=5.0).contains(&rating) {
            return Err(ValidationError::InvalidListing(format!(
                "rating must be between 0 and 5, got {}",
                rating
            )));
        }
    }

    let non_negative = [
        ("price", fields.price),
        ("areaSqFt", fields.area_sq_ft),
        ("bedrooms", fields.bedrooms.map(|n| n as f64)),
        ("bathrooms", fields.bathrooms.map(|n| n as f64)),
    ];
    for (name, value) in non_negative {
        if let Some(value) = value {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidListing(format!(
                    "{} must be a non-negative number",
                    name
                )));
            }
        }
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::MissingParameter("email".to_string()));
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::InvalidParameter(format!(
            "'{}' is not a valid email address",
            email
        ))),
    }
}
