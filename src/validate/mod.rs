//! Declarative field validation.
//!
//! Every write endpoint runs its input through a `Schema` before anything
//! touches the database. Checks run in declaration order and stop at the
//! first failure, so callers always get a single field-level error message.

use chrono::NaiveDate;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Free text, length bounds in characters.
    Text { min: usize, max: usize },
    /// Fixed-length numeric string, stored as text to keep leading zeros.
    Digits { len: usize },
    Integer { min: i64, max: i64 },
    /// Calendar date, canonicalized to YYYY-MM-DD.
    Date,
    OneOf(&'static [&'static str]),
    Email,
    /// Never trimmed; the raw value is what gets hashed.
    Password { min: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

pub const fn req(name: &'static str, kind: FieldKind) -> FieldDef {
    FieldDef { name, kind, required: true }
}

pub const fn opt(name: &'static str, kind: FieldKind) -> FieldDef {
    FieldDef { name, kind, required: false }
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub fields: &'static [FieldDef],
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: String) -> Self {
        Self { field, message }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    /// All required fields must be present.
    Create,
    /// Absent fields are left untouched; provided fields are fully checked.
    Update,
}

/// Checks `fields` against `schema` and returns the typed column values.
///
/// Unknown fields are ignored. An empty string for an optional field maps
/// to `Value::Null`, which is how a form clears a stored value.
pub fn validate(
    schema: &Schema,
    fields: &HashMap<String, String>,
    mode: Mode,
) -> Result<Map<String, Value>, FieldError> {
    let mut out = Map::new();

    for field in schema.fields {
        let provided = fields.get(field.name).map(|raw| match field.kind {
            FieldKind::Password { .. } => raw.as_str(),
            _ => raw.trim(),
        });

        let raw = match provided {
            None if mode == Mode::Update => continue,
            None | Some("") => {
                if field.required {
                    return Err(FieldError::new(
                        field.name,
                        format!("{} is required", field.name),
                    ));
                }
                out.insert(field.name.to_string(), Value::Null);
                continue;
            }
            Some(raw) => raw,
        };

        out.insert(field.name.to_string(), check(field, raw)?);
    }

    Ok(out)
}

fn check(field: &FieldDef, raw: &str) -> Result<Value, FieldError> {
    let name = field.name;

    match field.kind {
        FieldKind::Text { min, max } => {
            let len = raw.chars().count();
            if len < min {
                return Err(FieldError::new(
                    name,
                    format!("{name} must be at least {min} characters"),
                ));
            }
            if len > max {
                return Err(FieldError::new(
                    name,
                    format!("{name} must be at most {max} characters"),
                ));
            }
            Ok(Value::String(raw.to_string()))
        }
        FieldKind::Digits { len } => {
            if raw.len() != len || !raw.bytes().all(|b| b.is_ascii_digit()) {
                return Err(FieldError::new(
                    name,
                    format!("{name} must be exactly {len} digits"),
                ));
            }
            Ok(Value::String(raw.to_string()))
        }
        FieldKind::Integer { min, max } => {
            let n: i64 = raw.parse().map_err(|_| {
                FieldError::new(name, format!("{name} must be a whole number"))
            })?;
            if n < min || n > max {
                return Err(FieldError::new(
                    name,
                    format!("{name} must be between {min} and {max}"),
                ));
            }
            Ok(Value::Number(Number::from(n)))
        }
        FieldKind::Date => {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(raw, "%d-%m-%Y"))
                .map_err(|_| {
                    FieldError::new(name, format!("{name} must be a valid date (YYYY-MM-DD)"))
                })?;
            Ok(Value::String(date.format("%Y-%m-%d").to_string()))
        }
        FieldKind::OneOf(options) => {
            if !options.contains(&raw) {
                return Err(FieldError::new(
                    name,
                    format!("{name} must be one of: {}", options.join(", ")),
                ));
            }
            Ok(Value::String(raw.to_string()))
        }
        FieldKind::Email => {
            if !looks_like_email(raw) {
                return Err(FieldError::new(
                    name,
                    format!("{name} must be a valid email address"),
                ));
            }
            Ok(Value::String(raw.to_lowercase()))
        }
        FieldKind::Password { min } => {
            if raw.chars().count() < min {
                return Err(FieldError::new(
                    name,
                    format!("{name} must be at least {min} characters"),
                ));
            }
            Ok(Value::String(raw.to_string()))
        }
    }
}

fn looks_like_email(raw: &str) -> bool {
    if raw.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERSON: Schema = Schema {
        fields: &[
            req("name", FieldKind::Text { min: 2, max: 50 }),
            req("nik", FieldKind::Digits { len: 16 }),
            req("gender", FieldKind::OneOf(&["male", "female"])),
            opt("note", FieldKind::Text { min: 0, max: 100 }),
            opt("income", FieldKind::Integer { min: 0, max: 1_000_000 }),
            opt("birth_date", FieldKind::Date),
        ],
    };

    fn input(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_create_happy_path() {
        let fields = input(&[
            ("name", "  Siti Aminah  "),
            ("nik", "3201011234567890"),
            ("gender", "female"),
            ("income", "250000"),
            ("birth_date", "1990-02-03"),
        ]);
        let out = validate(&PERSON, &fields, Mode::Create).unwrap();
        assert_eq!(out["name"], "Siti Aminah");
        assert_eq!(out["nik"], "3201011234567890");
        assert_eq!(out["income"], 250_000);
        assert_eq!(out["note"], Value::Null);
        assert_eq!(out["birth_date"], "1990-02-03");
    }

    #[test]
    fn test_missing_required_field() {
        let fields = input(&[("nik", "3201011234567890"), ("gender", "male")]);
        let err = validate(&PERSON, &fields, Mode::Create).unwrap_err();
        assert_eq!(err.field, "name");
        assert!(err.message.contains("required"));
    }

    #[test]
    fn test_first_error_wins_in_declaration_order() {
        // Both nik and gender are wrong; nik is declared first.
        let fields = input(&[("name", "Budi"), ("nik", "12345"), ("gender", "unknown")]);
        let err = validate(&PERSON, &fields, Mode::Create).unwrap_err();
        assert_eq!(err.field, "nik");
    }

    #[test]
    fn test_digits_rejects_wrong_length_and_non_digits() {
        let mut fields = input(&[("name", "Budi"), ("gender", "male")]);
        fields.insert("nik".into(), "123".into());
        let err = validate(&PERSON, &fields, Mode::Create).unwrap_err();
        assert!(err.message.contains("16 digits"));

        fields.insert("nik".into(), "32010112345678AB".into());
        let err = validate(&PERSON, &fields, Mode::Create).unwrap_err();
        assert_eq!(err.field, "nik");
    }

    #[test]
    fn test_integer_bounds_and_parse() {
        let base = [("name", "Budi"), ("nik", "3201011234567890"), ("gender", "male")];

        let mut fields = input(&base);
        fields.insert("income".into(), "abc".into());
        let err = validate(&PERSON, &fields, Mode::Create).unwrap_err();
        assert!(err.message.contains("whole number"));

        let mut fields = input(&base);
        fields.insert("income".into(), "2000000".into());
        let err = validate(&PERSON, &fields, Mode::Create).unwrap_err();
        assert!(err.message.contains("between"));
    }

    #[test]
    fn test_date_alternate_format_is_canonicalized() {
        let mut fields = input(&[("name", "Budi"), ("nik", "3201011234567890"), ("gender", "male")]);
        fields.insert("birth_date".into(), "03-02-1990".into());
        let out = validate(&PERSON, &fields, Mode::Create).unwrap();
        assert_eq!(out["birth_date"], "1990-02-03");

        fields.insert("birth_date".into(), "1990-13-40".into());
        let err = validate(&PERSON, &fields, Mode::Create).unwrap_err();
        assert_eq!(err.field, "birth_date");
    }

    #[test]
    fn test_one_of_lists_options_in_message() {
        let fields = input(&[("name", "Budi"), ("nik", "3201011234567890"), ("gender", "other")]);
        let err = validate(&PERSON, &fields, Mode::Create).unwrap_err();
        assert!(err.message.contains("male, female"));
    }

    #[test]
    fn test_email_is_lowercased() {
        const SIGN_UP: Schema = Schema {
            fields: &[req("email", FieldKind::Email)],
        };
        let out = validate(&SIGN_UP, &input(&[("email", "Budi@Example.COM")]), Mode::Create).unwrap();
        assert_eq!(out["email"], "budi@example.com");

        let err = validate(&SIGN_UP, &input(&[("email", "not-an-email")]), Mode::Create).unwrap_err();
        assert_eq!(err.field, "email");
    }

    #[test]
    fn test_update_skips_absent_fields() {
        let fields = input(&[("name", "Renamed")]);
        let out = validate(&PERSON, &fields, Mode::Update).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out["name"], "Renamed");
    }

    #[test]
    fn test_update_clears_optional_with_empty_string() {
        let fields = input(&[("note", "")]);
        let out = validate(&PERSON, &fields, Mode::Update).unwrap();
        assert_eq!(out["note"], Value::Null);
    }

    #[test]
    fn test_update_rejects_emptied_required_field() {
        let fields = input(&[("name", "   ")]);
        let err = validate(&PERSON, &fields, Mode::Update).unwrap_err();
        assert_eq!(err.field, "name");
        assert!(err.message.contains("required"));
    }

    #[test]
    fn test_password_is_not_trimmed() {
        const SIGN_UP: Schema = Schema {
            fields: &[req("password", FieldKind::Password { min: 8 })],
        };
        let out = validate(&SIGN_UP, &input(&[("password", " hunter42 ")]), Mode::Create).unwrap();
        assert_eq!(out["password"], " hunter42 ");

        let err = validate(&SIGN_UP, &input(&[("password", "short")]), Mode::Create).unwrap_err();
        assert!(err.message.contains("at least 8"));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let mut fields = input(&[("name", "Budi"), ("nik", "3201011234567890"), ("gender", "male")]);
        fields.insert("role".into(), "admin".into());
        let out = validate(&PERSON, &fields, Mode::Create).unwrap();
        assert!(!out.contains_key("role"));
    }
}
