use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use super::error::ValidationError;
use crate::constants::{MAX_CHAR_LENGTH, PRICE_DECIMAL_PLACES, PRICE_MAX_DIGITS};

pub type FormData = serde_json::Map<String, Value>;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";

/// Rules for a text field. Values are trimmed unless `untrimmed` is set.
#[derive(Clone, Copy, Debug)]
pub struct Text {
    required: bool,
    allow_blank: bool,
    trim: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl Text {
    pub const fn required() -> Self {
        Self {
            required: true,
            allow_blank: false,
            trim: true,
            min_length: None,
            max_length: None,
        }
    }

    pub const fn optional() -> Self {
        Self {
            required: false,
            allow_blank: true,
            ..Self::required()
        }
    }

    pub const fn max(self, max_length: usize) -> Self {
        Self {
            max_length: Some(max_length),
            ..self
        }
    }

    pub const fn min(self, min_length: usize) -> Self {
        Self {
            min_length: Some(min_length),
            ..self
        }
    }

    pub const fn untrimmed(self) -> Self {
        Self { trim: false, ..self }
    }
}

/// Validating view over a request body. Errors are collected per field and
/// returned together by [`Form::finish`]. A partial form (PATCH) skips the
/// required check for absent keys.
pub struct Form {
    inner: FormData,
    partial: bool,
    errors: ValidationError,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self {
            inner: data,
            partial: false,
            errors: ValidationError::default(),
        }
    }

    pub fn partial(data: FormData) -> Self {
        Self {
            partial: true,
            ..Self::from_data(data)
        }
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn take(&mut self, key: &str, required: bool) -> Option<Value> {
        match self.inner.get(key) {
            None => {
                if required && !self.partial {
                    self.errors.push(key, REQUIRED);
                }
                None
            }
            Some(Value::Null) => {
                self.errors.push(key, NOT_NULL);
                None
            }
            Some(value) => Some(value.to_owned()),
        }
    }

    pub fn text(&mut self, key: &str, rules: Text) -> Option<String> {
        let value = self.take(key, rules.required)?;
        let value = match check_text(&value, rules) {
            Ok(value) => value,
            Err(message) => {
                self.errors.push(key, message);
                return None;
            }
        };
        Some(value)
    }

    pub fn email(&mut self, key: &str) -> Option<String> {
        let value = self.text(key, Text::required().max(MAX_CHAR_LENGTH))?;
        if !is_valid_email(&value) {
            self.errors.push(key, "Enter a valid email address.");
            return None;
        }
        Some(value)
    }

    pub fn integer(&mut self, key: &str, required: bool) -> Option<i32> {
        let value = self.take(key, required)?;
        let parsed = match &value {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        };

        match parsed.and_then(|n| i32::try_from(n).ok()) {
            Some(n) => Some(n),
            None => {
                self.errors.push(key, "A valid integer is required.");
                None
            }
        }
    }

    pub fn decimal(&mut self, key: &str, required: bool) -> Option<Decimal> {
        let value = self.take(key, required)?;
        let parsed = match &value {
            Value::Number(number) => Decimal::from_str(&number.to_string()).ok(),
            Value::String(text) => Decimal::from_str(text.trim()).ok(),
            _ => None,
        };

        let Some(parsed) = parsed else {
            self.errors.push(key, "A valid number is required.");
            return None;
        };
        match check_price_digits(parsed) {
            Ok(()) => Some(parsed),
            Err(message) => {
                self.errors.push(key, message);
                None
            }
        }
    }

    /// A list of `{"name": ...}` objects, as used for nested tags and ingredients.
    pub fn named_list(&mut self, key: &str) -> Option<Vec<String>> {
        let value = self.take(key, false)?;
        let Value::Array(items) = value else {
            self.errors.push(
                key,
                format!(
                    "Expected a list of items but got type \"{}\".",
                    value_kind(&value)
                ),
            );
            return None;
        };

        let rules = Text::required().max(MAX_CHAR_LENGTH);
        let mut names = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let name = match item {
                Value::Object(object) => match object.get("name") {
                    None => Err(String::from(REQUIRED)),
                    Some(Value::Null) => Err(String::from(NOT_NULL)),
                    Some(name) => check_text(name, rules),
                },
                other => Err(format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    value_kind(other)
                )),
            };

            match name {
                Ok(name) => names.push(name),
                Err(message) => self.errors.push(key, format!("{index}.name: {message}")),
            }
        }

        if names.len() == items.len() {
            Some(names)
        } else {
            None
        }
    }
}

fn check_text(value: &Value, rules: Text) -> Result<String, String> {
    let text = match value {
        Value::String(text) => text.to_owned(),
        Value::Number(number) => number.to_string(),
        _ => return Err(String::from("Not a valid string.")),
    };
    let text = if rules.trim {
        text.trim().to_string()
    } else {
        text
    };

    if text.is_empty() {
        if rules.allow_blank {
            return Ok(text);
        }
        return Err(String::from(NOT_BLANK));
    }

    let length = text.chars().count();
    if let Some(max) = rules.max_length {
        if length > max {
            return Err(format!("Ensure this field has no more than {max} characters."));
        }
    }
    if let Some(min) = rules.min_length {
        if length < min {
            return Err(format!("Ensure this field has at least {min} characters."));
        }
    }

    Ok(text)
}

fn check_price_digits(value: Decimal) -> Result<(), String> {
    let value = value.normalize();
    let decimals = value.scale();
    let whole = value.trunc().abs();
    let whole_digits = if whole.is_zero() {
        0
    } else {
        whole.to_string().len() as u32
    };

    if whole_digits + decimals > PRICE_MAX_DIGITS {
        return Err(format!(
            "Ensure that there are no more than {PRICE_MAX_DIGITS} digits in total."
        ));
    }
    if decimals > PRICE_DECIMAL_PLACES {
        return Err(format!(
            "Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."
        ));
    }
    let max_whole = PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES;
    if whole_digits > max_whole {
        return Err(format!(
            "Ensure that there are no more than {max_whole} digits before the decimal point."
        ));
    }
    Ok(())
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    if domain.eq_ignore_ascii_case("localhost") {
        return true;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
