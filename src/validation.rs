//! Input validation.
//!
//! [`validate_schema`] first trims every string in the input (recursively,
//! through nested structs, `Box`, `Option` and `Vec`), then checks each
//! field's declared [`Rule`]s. Every failing field is reported once, with the
//! first rule it broke, under its wire name:
//!
//! ```json
//! [{"key": "sheetId", "message": "validation failed on 'required' constraint"}]
//! ```

use serde::Serialize;
use uuid::Uuid;

use crate::error::DomainError;

/// Machine code of a failed validation.
pub const INVALID_PAYLOAD_CODE: &str = "ERR_INVALID_PAYLOAD";

/// A single constraint on a string field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Rule {
    /// Present and non-empty.
    Required,
    /// Contains at least one non-whitespace character.
    NotBlank,
    /// Equal to a fixed literal.
    Equals(&'static str),
    /// Parses as a UUID.
    Uuid,
}

impl Rule {
    fn tag(self) -> &'static str {
        match self {
            Self::Required  => "required",
            Self::NotBlank  => "notblank",
            Self::Equals(_) => "eq",
            Self::Uuid      => "uuid",
        }
    }

    fn check(self, value: Option<&str>) -> bool {
        match (self, value) {
            (Self::Required, v) => v.is_some_and(|s| !s.is_empty()),
            (Self::NotBlank, v) => v.is_some_and(|s| !s.trim().is_empty()),
            (Self::Equals(expected), v) => v == Some(expected),
            (Self::Uuid, v) => v.is_some_and(|s| Uuid::parse_str(s).is_ok()),
        }
    }
}

/// One field-level failure, as it appears in the error payload.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FieldIssue {
    pub key: String,
    pub message: String,
}

/// Collects rule checks for one input value.
#[derive(Default)]
pub struct Checks {
    issues: Vec<FieldIssue>,
}

impl Checks {
    /// Applies `rules` in order to the field published as `key`; records the
    /// first one that fails.
    pub fn field(&mut self, key: &str, value: Option<&str>, rules: &[Rule]) -> &mut Self {
        if let Some(rule) = rules.iter().find(|rule| !rule.check(value)) {
            self.issues.push(FieldIssue {
                key: key.to_owned(),
                message: format!("validation failed on '{}' constraint", rule.tag()),
            });
        }
        self
    }
}

/// Recursive in-place whitespace trimming of string fields.
pub trait Trim {
    fn trim_strings(&mut self);
}

impl Trim for String {
    fn trim_strings(&mut self) {
        let trimmed = self.trim();
        if trimmed.len() != self.len() {
            *self = trimmed.to_owned();
        }
    }
}

impl<T: Trim> Trim for Option<T> {
    fn trim_strings(&mut self) {
        if let Some(inner) = self {
            inner.trim_strings();
        }
    }
}

impl<T: Trim + ?Sized> Trim for Box<T> {
    fn trim_strings(&mut self) {
        (**self).trim_strings();
    }
}

impl<T: Trim> Trim for Vec<T> {
    fn trim_strings(&mut self) {
        self.iter_mut().for_each(Trim::trim_strings);
    }
}

/// A value with declared per-field constraints.
pub trait Validate: Trim {
    fn checks(&self, checks: &mut Checks);
}

/// Trims `input`, then checks its rules.
///
/// Returns a bad-request [`DomainError`] coded [`INVALID_PAYLOAD_CODE`]
/// whose payload lists every failing field.
pub fn validate_schema<T: Validate>(input: &mut T) -> Result<(), DomainError> {
    input.trim_strings();

    let mut checks = Checks::default();
    input.checks(&mut checks);
    if checks.issues.is_empty() {
        return Ok(());
    }

    let payload = serde_json::to_value(&checks.issues).unwrap_or_default();
    Err(DomainError::bad_request(INVALID_PAYLOAD_CODE, "Invalid payload supplied").with_payload(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Address {
        city: String,
    }

    impl Trim for Address {
        fn trim_strings(&mut self) {
            self.city.trim_strings();
        }
    }

    #[derive(Default)]
    struct Visit {
        kind: String,
        building_id: String,
        note: Option<String>,
        address: Box<Address>,
        tags: Vec<String>,
    }

    impl Trim for Visit {
        fn trim_strings(&mut self) {
            self.kind.trim_strings();
            self.building_id.trim_strings();
            self.note.trim_strings();
            self.address.trim_strings();
            self.tags.trim_strings();
        }
    }

    impl Validate for Visit {
        fn checks(&self, checks: &mut Checks) {
            checks
                .field("type", Some(self.kind.as_str()), &[Rule::Required, Rule::Equals("FAMILY")])
                .field("buildingId", Some(self.building_id.as_str()), &[Rule::NotBlank, Rule::Uuid])
                .field("city", Some(self.address.city.as_str()), &[Rule::Required]);
        }
    }

    fn valid() -> Visit {
        Visit {
            kind: "FAMILY".to_owned(),
            building_id: "6f1c1c1e-3f43-4c53-9d7b-2a0f7c2e9a10".to_owned(),
            address: Box::new(Address { city: "Lima".to_owned() }),
            ..Visit::default()
        }
    }

    #[test]
    fn trims_recursively_before_checking() {
        let mut visit = Visit {
            kind: "  FAMILY\t".to_owned(),
            note: Some(" hi ".to_owned()),
            address: Box::new(Address { city: "\nLima ".to_owned() }),
            tags: vec![" a".to_owned(), "b ".to_owned()],
            ..valid()
        };

        validate_schema(&mut visit).unwrap();
        assert_eq!(visit.kind, "FAMILY");
        assert_eq!(visit.note.as_deref(), Some("hi"));
        assert_eq!(visit.address.city, "Lima");
        assert_eq!(visit.tags, ["a", "b"]);
    }

    #[test]
    fn reports_first_broken_rule_per_field() {
        let mut visit = Visit {
            kind: "FRIEND".to_owned(),
            building_id: "   ".to_owned(),
            address: Box::new(Address { city: String::new() }),
            ..valid()
        };

        let err = validate_schema(&mut visit).unwrap_err();
        assert_eq!(err.code(), INVALID_PAYLOAD_CODE);
        assert_eq!(
            err.payload(),
            Some(&json!([
                {"key": "type", "message": "validation failed on 'eq' constraint"},
                {"key": "buildingId", "message": "validation failed on 'notblank' constraint"},
                {"key": "city", "message": "validation failed on 'required' constraint"},
            ])),
        );
    }

    #[test]
    fn uuid_rule() {
        let mut visit = Visit { building_id: "not-a-uuid".to_owned(), ..valid() };
        let err = validate_schema(&mut visit).unwrap_err();
        assert_eq!(err.payload().unwrap()[0]["message"], "validation failed on 'uuid' constraint");
    }

    #[test]
    fn missing_value_fails_required() {
        assert!(!Rule::Required.check(None));
        assert!(!Rule::Required.check(Some("")));
        assert!(Rule::Required.check(Some(" ")));
        assert!(!Rule::NotBlank.check(Some(" ")));
    }
}
