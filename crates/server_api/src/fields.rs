use serde_json::Value;
use shared::{
    domain::{Rating, ReviewFields, GUEST_REVIEWER},
    error::{ApiError, ErrorCode},
    protocol::ReviewPayload,
    validation::{is_valid_name, to_proper_name},
};

pub(crate) fn required_rating(value: Option<&Value>) -> Result<Rating, ApiError> {
    let Some(value) = value else {
        return Err(ApiError::for_field(
            ErrorCode::MissingField,
            "rating",
            "rating is required",
        ));
    };
    parse_rating(value)
}

/// Accepts JSON integers and floats with no fractional part, so `4` and `4.0` both read as 4.
pub(crate) fn parse_rating(value: &Value) -> Result<Rating, ApiError> {
    let whole = value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.fract() == 0.0)
            .map(|n| n as i64)
    });
    whole.and_then(Rating::new).ok_or_else(|| {
        ApiError::for_field(
            ErrorCode::Validation,
            "rating",
            format!(
                "rating must be a whole number between {} and {}",
                Rating::MIN,
                Rating::MAX
            ),
        )
    })
}

pub(crate) fn optional_text(value: Option<&Value>) -> Result<Option<String>, ApiError> {
    match value {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(ApiError::for_field(
            ErrorCode::Validation,
            "text",
            "text must be a string",
        )),
    }
}

/// Validates a supplied reviewer and returns it title-cased.
pub(crate) fn reviewer(value: &Value) -> Result<String, ApiError> {
    match value {
        Value::String(name) if name.is_empty() => Err(ApiError::for_field(
            ErrorCode::Validation,
            "reviewedBy",
            "reviewedBy must not be empty",
        )),
        Value::String(name) if is_valid_name(name) => Ok(to_proper_name(name)),
        _ => Err(ApiError::for_field(
            ErrorCode::Validation,
            "reviewedBy",
            "reviewedBy must be letters separated by single spaces",
        )),
    }
}

pub(crate) fn reviewer_or_guest(value: Option<&Value>) -> Result<String, ApiError> {
    match value {
        Some(value) => reviewer(value),
        None => Ok(GUEST_REVIEWER.to_string()),
    }
}

/// Turns an update body into the fields to write.
///
/// With `guest_when_absent` a body without `reviewedBy` resets the reviewer to the guest
/// name instead of leaving it as stored.
pub(crate) fn update_fields(
    payload: &ReviewPayload,
    guest_when_absent: bool,
) -> Result<ReviewFields, ApiError> {
    let supplied = [
        ("rating", &payload.rating),
        ("text", &payload.text),
        ("reviewedBy", &payload.reviewed_by),
    ];
    for (field, value) in supplied {
        if matches!(value, Some(Value::String(s)) if s.is_empty()) {
            return Err(ApiError::for_field(
                ErrorCode::Validation,
                field,
                format!("{field} must not be empty"),
            ));
        }
    }

    let text = optional_text(payload.text.as_ref())?;
    let rating = payload.rating.as_ref().map(parse_rating).transpose()?;
    let reviewed_by = match payload.reviewed_by.as_ref() {
        Some(value) => Some(reviewer(value)?),
        None if guest_when_absent => Some(GUEST_REVIEWER.to_string()),
        None => None,
    };

    let unsupported = payload.unsupported_keys();
    if let Some(first) = unsupported.first() {
        return Err(ApiError::for_field(
            ErrorCode::UnsupportedField,
            first,
            format!(
                "only rating, text and reviewedBy can be updated; got {}",
                unsupported.join(", ")
            ),
        ));
    }

    Ok(ReviewFields {
        rating,
        text,
        reviewed_by,
    })
}
