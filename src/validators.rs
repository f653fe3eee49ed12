use chrono::NaiveDate;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::ApiError;

/// FieldError
///
/// One failed rule, reported back to the client inside `{"errors": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check
///
/// The primitive checks a rule can apply to a single body field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// The value is a JSON string.
    String,
    /// The value is a JSON number or a string holding a decimal number.
    Numeric,
    /// The value is a `YYYY-MM-DD` string naming a real calendar date.
    Date,
    /// The value is present, not null, and not an empty string.
    NotEmpty,
}

/// FieldRule
///
/// Declarative rule for one field. Optional rules are skipped entirely when the
/// value is absent or falsy (`null`, `false`, `0`, `""`).
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub optional: bool,
    pub checks: &'static [(Check, &'static str)],
}

/// Rules applied to book write bodies (`POST /books`, `POST /authors/{id}/books`).
pub const BOOK_RULES: &[FieldRule] = &[
    FieldRule {
        field: "title",
        optional: false,
        checks: &[
            (Check::String, "Title must be a string"),
            (Check::NotEmpty, "Title is required"),
        ],
    },
    FieldRule {
        field: "yearPublished",
        optional: true,
        checks: &[(Check::Numeric, "Publish Year must be a number")],
    },
    FieldRule {
        field: "genre",
        optional: false,
        checks: &[
            (Check::String, "Genre must be a string"),
            (Check::NotEmpty, "Genre is required"),
        ],
    },
];

/// Rules for author bodies. Not mounted on any route; author writes are decoded
/// directly.
pub const AUTHOR_RULES: &[FieldRule] = &[
    FieldRule {
        field: "name",
        optional: false,
        checks: &[
            (Check::String, "Name must be a string"),
            (Check::NotEmpty, "Name is required"),
        ],
    },
    FieldRule {
        field: "born",
        optional: true,
        checks: &[(Check::Date, "Born must be a date")],
    },
    FieldRule {
        field: "city",
        optional: false,
        checks: &[
            (Check::String, "City must be a string"),
            (Check::NotEmpty, "City is required"),
        ],
    },
];

/// Runs every rule against `body` and collects all failures, in rule order.
pub fn validate(body: &Value, rules: &[FieldRule]) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for rule in rules {
        let value = body.get(rule.field);
        if rule.optional && value.is_none_or(is_falsy) {
            continue;
        }
        for (check, message) in rule.checks {
            if !passes(*check, value) {
                errors.push(FieldError::new(rule.field, *message));
            }
        }
    }
    errors
}

pub fn validate_book(body: &Value) -> Vec<FieldError> {
    validate(body, BOOK_RULES)
}

pub fn validate_author(body: &Value) -> Vec<FieldError> {
    validate(body, AUTHOR_RULES)
}

/// Validates `body` and decodes it into the typed request.
///
/// A body that satisfies the rules but still does not fit `T` (a missing
/// `authorId`, say) is reported as a single error on the `body` field.
pub fn validated<T: DeserializeOwned>(body: Value, rules: &[FieldRule]) -> Result<T, ApiError> {
    let errors = validate(&body, rules);
    if !errors.is_empty() {
        return Err(ApiError::ValidationFailed(errors));
    }
    serde_json::from_value(body)
        .map_err(|e| ApiError::ValidationFailed(vec![FieldError::new("body", e.to_string())]))
}

fn passes(check: Check, value: Option<&Value>) -> bool {
    match check {
        Check::String => matches!(value, Some(Value::String(_))),
        Check::Numeric => match value {
            Some(Value::Number(_)) => true,
            Some(Value::String(s)) => is_numeric_str(s),
            _ => false,
        },
        Check::Date => match value {
            Some(Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
            _ => false,
        },
        Check::NotEmpty => match value {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        },
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

// Optional sign, digits, at most one decimal point, at least one digit.
fn is_numeric_str(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    let mut seen_digit = false;
    let mut seen_dot = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateBookRequest;
    use serde_json::json;

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn valid_book_passes() {
        let body = json!({
            "title": "Dune",
            "authorId": 1,
            "yearPublished": 1965,
            "genre": "Science Fiction"
        });
        assert!(validate_book(&body).is_empty());
    }

    #[test]
    fn missing_title_reports_type_and_presence() {
        let body = json!({ "genre": "Poetry" });
        let errors = validate_book(&body);
        assert_eq!(
            errors,
            vec![
                FieldError::new("title", "Title must be a string"),
                FieldError::new("title", "Title is required"),
            ]
        );
    }

    #[test]
    fn empty_genre_is_required() {
        let body = json!({ "title": "Dune", "genre": "" });
        assert_eq!(
            validate_book(&body),
            vec![FieldError::new("genre", "Genre is required")]
        );
    }

    #[test]
    fn non_string_title_fails_type_only() {
        let body = json!({ "title": 42, "genre": "Poetry" });
        assert_eq!(
            validate_book(&body),
            vec![FieldError::new("title", "Title must be a string")]
        );
    }

    #[test]
    fn year_published_is_optional_but_must_be_numeric() {
        assert!(validate_book(&json!({ "title": "a", "genre": "b" })).is_empty());
        assert!(validate_book(&json!({ "title": "a", "genre": "b", "yearPublished": 0 })).is_empty());
        assert!(validate_book(&json!({ "title": "a", "genre": "b", "yearPublished": "1999" })).is_empty());

        let errors = validate_book(&json!({ "title": "a", "genre": "b", "yearPublished": "soon" }));
        assert_eq!(fields(&errors), vec!["yearPublished"]);

        let errors = validate_book(&json!({ "title": "a", "genre": "b", "yearPublished": true }));
        assert_eq!(fields(&errors), vec!["yearPublished"]);
    }

    #[test]
    fn author_rules_check_date_and_presence() {
        let ok = json!({ "name": "John Doe", "born": "1990-01-01", "city": "New York" });
        assert!(validate_author(&ok).is_empty());

        let no_born = json!({ "name": "John Doe", "city": "New York" });
        assert!(validate_author(&no_born).is_empty());

        let bad = json!({ "name": "", "born": "1990-13-45", "city": 7 });
        assert_eq!(
            validate_author(&bad),
            vec![
                FieldError::new("name", "Name is required"),
                FieldError::new("born", "Born must be a date"),
                FieldError::new("city", "City must be a string"),
            ]
        );
    }

    #[test]
    fn validated_decodes_or_reports_body_error() {
        let body = json!({ "title": "Dune", "authorId": 1, "yearPublished": 1965, "genre": "SF" });
        let book: CreateBookRequest = validated(body, BOOK_RULES).unwrap();
        assert_eq!(book.author_id, 1);

        let missing_author = json!({ "title": "Dune", "yearPublished": 1965, "genre": "SF" });
        match validated::<CreateBookRequest>(missing_author, BOOK_RULES) {
            Err(ApiError::ValidationFailed(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "body");
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn numeric_strings() {
        assert!(is_numeric_str("2020"));
        assert!(is_numeric_str("-3.5"));
        assert!(is_numeric_str(".5"));
        assert!(!is_numeric_str(""));
        assert!(!is_numeric_str("1.2.3"));
        assert!(!is_numeric_str("NaN"));
    }
}
