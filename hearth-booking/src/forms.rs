use std::collections::BTreeMap;

use hearth_core::GuestDetails;
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

/// Accumulating validator over submitted field→value data. Checks record
/// every violation instead of stopping at the first, so a form can surface
/// all of its problems in one response.
#[derive(Debug, Default)]
pub struct Form {
    values: BTreeMap<String, String>,
    errors: FormErrors,
}

impl Form {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        let values = pairs
            .iter()
            .map(|(field, value)| (field.to_string(), value.to_string()))
            .collect();
        Self {
            values,
            errors: FormErrors::default(),
        }
    }

    pub fn value(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or("")
    }

    /// Every listed field must be present and non-blank.
    pub fn required(&mut self, fields: &[&str]) -> &mut Self {
        for field in fields {
            if self.value(field).trim().is_empty() {
                self.errors.add(field, "This field cannot be blank");
            }
        }
        self
    }

    /// Field must hold at least `length` characters.
    pub fn min_length(&mut self, field: &str, length: usize) -> &mut Self {
        if self.value(field).chars().count() < length {
            self.errors.add(
                field,
                &format!("This field must be at least {length} characters long"),
            );
        }
        self
    }

    /// Syntactic email check on the field value.
    pub fn is_email(&mut self, field: &str) -> &mut Self {
        if !self.value(field).validate_email() {
            self.errors.add(field, "Invalid email address");
        }
        self
    }

    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> FormErrors {
        self.errors
    }
}

/// Field name → messages, in field order.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// First message recorded for a field, if any.
    pub fn first(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }
}

/// Guest details exactly as submitted, before validation. Kept in the
/// draft so a rejected form can be re-rendered with its values intact.
/// Fields missing from the submission deserialize as blanks and are
/// reported by `validate`, never by the deserializer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl GuestForm {
    /// Run the structural checks: required first/last/email, minimum name
    /// lengths, email syntax. Success yields trimmed guest details.
    pub fn validate(&self) -> Result<GuestDetails, FormErrors> {
        let mut form = Form::new(&[
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("phone", &self.phone),
        ]);
        form.required(&["first_name", "last_name", "email"]);
        form.min_length("first_name", 3);
        form.min_length("last_name", 3);
        form.is_email("email");

        if !form.valid() {
            return Err(form.into_errors());
        }

        let phone = self.phone.trim();
        Ok(GuestDetails {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: (!phone.is_empty()).then(|| phone.to_string()),
        })
    }
}
