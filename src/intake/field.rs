//! Field registry types: declared inputs, their values, and validation rules.

use chrono::{NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{IntakeError, ValidationError};

/// Date format accepted from and rendered to the presentation surface.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The semantic type of a field, which decides how raw input is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SemanticType {
    Text,
    Date,
    Number,
    SingleChoice { options: Vec<String> },
    MultiChoice { options: Vec<String> },
    /// Accepted file extensions, lowercase without the dot. Empty accepts any.
    File { accept: Vec<String> },
}

impl SemanticType {
    fn describe(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Date => "a date (YYYY-MM-DD)",
            Self::Number => "a number",
            Self::SingleChoice { .. } => "one of the listed options",
            Self::MultiChoice { .. } => "a list of the listed options",
            Self::File { .. } => "a file",
        }
    }
}

/// Metadata of an uploaded file. The bytes themselves live with the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size_bytes: u64,
}

impl FileRef {
    /// Lowercase extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

/// A value held by the session store for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Number(f64),
    Choice(String),
    Choices(Vec<String>),
    File(FileRef),
}

impl FieldValue {
    /// Whether this value counts as "no value" for required-field checks.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) | Self::Choice(s) => s.trim().is_empty(),
            Self::Choices(items) => items.is_empty(),
            Self::File(f) => f.name.trim().is_empty(),
            Self::Date(_) | Self::Number(_) => false,
        }
    }

    fn matches(&self, semantic_type: &SemanticType) -> bool {
        matches!(
            (self, semantic_type),
            (Self::Text(_), SemanticType::Text)
                | (Self::Date(_), SemanticType::Date)
                | (Self::Number(_), SemanticType::Number)
                | (Self::Choice(_), SemanticType::SingleChoice { .. })
                | (Self::Choices(_), SemanticType::MultiChoice { .. })
                | (Self::File(_), SemanticType::File { .. })
        )
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) | Self::Choice(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Choices(items) => write!(f, "{}", items.join(", ")),
            Self::File(file) => write!(f, "{}", file.name),
        }
    }
}

/// A regular expression compiled once, carried as its source text in JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TextPattern(Regex);

impl TextPattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for TextPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl TryFrom<String> for TextPattern {
    type Error = regex::Error;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Self::new(&source)
    }
}

impl From<TextPattern> for String {
    fn from(pattern: TextPattern) -> Self {
        pattern.as_str().to_string()
    }
}

/// A declarative validation rule attached to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    /// Number must be >= value.
    Min { value: f64 },
    /// Number must be <= value.
    Max { value: f64 },
    /// Number must be whole.
    Integer,
    /// Text must have at most this many characters.
    MaxLength { chars: usize },
    /// Text must match the regular expression.
    Pattern { regex: TextPattern, message: String },
    /// Date must be today or earlier.
    NotInFuture,
}

impl Rule {
    /// A pattern rule. A regex that does not compile is a definition error.
    pub fn pattern(regex: &str, message: &str) -> Result<Self, IntakeError> {
        let regex = TextPattern::new(regex)
            .map_err(|e| IntakeError::Definition(format!("invalid pattern '{regex}': {e}")))?;
        Ok(Self::Pattern {
            regex,
            message: message.to_string(),
        })
    }

    /// Check a value against this rule. Rules that don't apply to the
    /// value's type pass.
    pub fn check(&self, value: &FieldValue) -> Result<(), String> {
        match (self, value) {
            (Self::Min { value: min }, FieldValue::Number(n)) if n < min => {
                Err(format!("must be at least {}", FieldValue::Number(*min)))
            }
            (Self::Max { value: max }, FieldValue::Number(n)) if n > max => {
                Err(format!("must be at most {}", FieldValue::Number(*max)))
            }
            (Self::Integer, FieldValue::Number(n)) if n.fract() != 0.0 => {
                Err("must be a whole number".to_string())
            }
            (Self::MaxLength { chars }, FieldValue::Text(s)) if s.chars().count() > *chars => {
                Err(format!("must be at most {chars} characters"))
            }
            (Self::Pattern { regex, message }, FieldValue::Text(s)) if !regex.is_match(s) => {
                Err(message.clone())
            }
            (Self::NotInFuture, FieldValue::Date(d)) if *d > Utc::now().date_naive() => {
                Err("cannot be in the future".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// A single user-editable input. Immutable once declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub label: String,
    pub semantic_type: SemanticType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    /// Display default for the presentation surface. Never counts as an entered value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<FieldValue>,
}

impl Field {
    pub fn new(name: &str, label: &str, semantic_type: SemanticType) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            semantic_type,
            required: false,
            rules: Vec::new(),
            help: None,
            default: None,
        }
    }

    pub fn text(name: &str, label: &str) -> Self {
        Self::new(name, label, SemanticType::Text)
    }

    pub fn date(name: &str, label: &str) -> Self {
        Self::new(name, label, SemanticType::Date)
    }

    pub fn number(name: &str, label: &str) -> Self {
        Self::new(name, label, SemanticType::Number)
    }

    pub fn single_choice(name: &str, label: &str, options: &[&str]) -> Self {
        Self::new(
            name,
            label,
            SemanticType::SingleChoice {
                options: options.iter().map(|o| o.to_string()).collect(),
            },
        )
    }

    pub fn multi_choice(name: &str, label: &str, options: &[&str]) -> Self {
        Self::new(
            name,
            label,
            SemanticType::MultiChoice {
                options: options.iter().map(|o| o.to_string()).collect(),
            },
        )
    }

    pub fn file(name: &str, label: &str, accept: &[&str]) -> Self {
        Self::new(
            name,
            label,
            SemanticType::File {
                accept: accept.iter().map(|a| a.to_ascii_lowercase()).collect(),
            },
        )
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    pub fn with_default(mut self, default: FieldValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Interpret a raw JSON value from the presentation surface according to
    /// this field's semantic type. `Ok(None)` means the field was cleared.
    pub fn interpret(&self, raw: &serde_json::Value) -> Result<Option<FieldValue>, ValidationError> {
        use serde_json::Value;

        if raw.is_null() {
            return Ok(None);
        }

        let mismatch = || {
            ValidationError::invalid(
                &self.name,
                format!("expected {}", self.semantic_type.describe()),
            )
        };

        let value = match (&self.semantic_type, raw) {
            (SemanticType::Text, Value::String(s)) => FieldValue::Text(s.clone()),
            (SemanticType::Date, Value::String(s)) => {
                let date = NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| mismatch())?;
                FieldValue::Date(date)
            }
            (SemanticType::Number, Value::Number(n)) => {
                FieldValue::Number(n.as_f64().ok_or_else(mismatch)?)
            }
            (SemanticType::Number, Value::String(s)) => {
                let n: f64 = s.trim().parse().map_err(|_| mismatch())?;
                if !n.is_finite() {
                    return Err(mismatch());
                }
                FieldValue::Number(n)
            }
            (SemanticType::SingleChoice { options }, Value::String(s)) => {
                if !options.contains(s) {
                    return Err(ValidationError::invalid(
                        &self.name,
                        format!("'{s}' is not one of: {}", options.join(", ")),
                    ));
                }
                FieldValue::Choice(s.clone())
            }
            (SemanticType::MultiChoice { options }, Value::Array(items)) => {
                let mut chosen: Vec<String> = Vec::with_capacity(items.len());
                for item in items {
                    let s = item.as_str().ok_or_else(mismatch)?;
                    if !options.iter().any(|o| o == s) {
                        return Err(ValidationError::invalid(
                            &self.name,
                            format!("'{s}' is not one of: {}", options.join(", ")),
                        ));
                    }
                    if !chosen.iter().any(|c| c == s) {
                        chosen.push(s.to_string());
                    }
                }
                FieldValue::Choices(chosen)
            }
            (SemanticType::File { accept }, Value::Object(_)) => {
                let file: FileRef = serde_json::from_value(raw.clone()).map_err(|_| mismatch())?;
                if !accept.is_empty() {
                    let ok = file
                        .extension()
                        .map(|ext| accept.iter().any(|a| *a == ext))
                        .unwrap_or(false);
                    if !ok {
                        return Err(ValidationError::invalid(
                            &self.name,
                            format!("file must be one of: {}", accept.join(", ")),
                        ));
                    }
                }
                FieldValue::File(file)
            }
            _ => return Err(mismatch()),
        };

        Ok(Some(value))
    }

    /// Validate the currently held value (or its absence).
    pub fn validate(&self, value: Option<&FieldValue>) -> Result<(), ValidationError> {
        let value = match value {
            Some(v) if !v.is_empty() => v,
            _ if self.required => {
                return Err(ValidationError::invalid(&self.name, "is required"));
            }
            _ => return Ok(()),
        };

        if !value.matches(&self.semantic_type) {
            return Err(ValidationError::invalid(
                &self.name,
                format!("expected {}", self.semantic_type.describe()),
            ));
        }

        for rule in &self.rules {
            rule.check(value)
                .map_err(|message| ValidationError::invalid(&self.name, message))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn interprets_each_semantic_type() {
        let text = Field::text("name", "Name");
        assert_eq!(
            text.interpret(&json!("Jane")).unwrap(),
            Some(FieldValue::Text("Jane".into()))
        );

        let date = Field::date("dob", "Date of Birth");
        assert_eq!(
            date.interpret(&json!("1990-01-01")).unwrap(),
            Some(FieldValue::Date(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()))
        );

        let number = Field::number("income", "Income");
        assert_eq!(number.interpret(&json!(1200)).unwrap(), Some(FieldValue::Number(1200.0)));
        assert_eq!(number.interpret(&json!(" 75.5 ")).unwrap(), Some(FieldValue::Number(75.5)));

        let multi = Field::multi_choice("langs", "Languages", &["en", "es"]);
        assert_eq!(
            multi.interpret(&json!(["es", "en", "es"])).unwrap(),
            Some(FieldValue::Choices(vec!["es".into(), "en".into()]))
        );
    }

    #[test]
    fn null_clears() {
        let field = Field::text("name", "Name");
        assert_eq!(field.interpret(&serde_json::Value::Null).unwrap(), None);
    }

    #[test]
    fn rejects_values_of_the_wrong_type() {
        assert!(Field::date("dob", "DOB").interpret(&json!("01/02/1990")).is_err());
        assert!(Field::number("income", "Income").interpret(&json!("lots")).is_err());
        assert!(Field::number("income", "Income").interpret(&json!("NaN")).is_err());
        assert!(Field::text("name", "Name").interpret(&json!(42)).is_err());
    }

    #[test]
    fn single_choice_must_be_an_option() {
        let field = Field::single_choice("insured", "Insured?", &["Yes", "No"]);
        assert!(field.interpret(&json!("Maybe")).is_err());
        assert_eq!(
            field.interpret(&json!("No")).unwrap(),
            Some(FieldValue::Choice("No".into()))
        );
    }

    #[test]
    fn file_extension_is_checked() {
        let field = Field::file("id_doc", "ID", &["pdf", "png"]);
        assert!(field.interpret(&json!({"name": "id.PDF", "size_bytes": 10})).is_ok());
        assert!(field.interpret(&json!({"name": "id.exe"})).is_err());
        assert!(field.interpret(&json!({"name": "noext"})).is_err());
        assert!(field.interpret(&json!("id.pdf")).is_err());
    }

    #[test]
    fn required_field_without_value_fails() {
        let field = Field::text("name", "Name").required();
        assert!(field.validate(None).is_err());
        assert!(field.validate(Some(&FieldValue::Text("   ".into()))).is_err());
        assert!(field.validate(Some(&FieldValue::Text("Jane".into()))).is_ok());
    }

    #[test]
    fn optional_field_still_runs_rules_when_set() {
        let field = Field::text("notes", "Notes").with_rule(Rule::MaxLength { chars: 3 });
        assert!(field.validate(None).is_ok());
        assert!(field.validate(Some(&FieldValue::Text("abcd".into()))).is_err());
    }

    #[test]
    fn numeric_rules() {
        let field = Field::number("household", "Household")
            .required()
            .with_rule(Rule::Min { value: 1.0 })
            .with_rule(Rule::Integer);
        assert!(field.validate(Some(&FieldValue::Number(0.0))).is_err());
        assert!(field.validate(Some(&FieldValue::Number(2.5))).is_err());
        assert!(field.validate(Some(&FieldValue::Number(3.0))).is_ok());
    }

    #[test]
    fn future_dates_rejected() {
        let field = Field::date("dob", "DOB").with_rule(Rule::NotInFuture);
        let tomorrow = Utc::now().date_naive() + chrono::Duration::days(1);
        assert!(field.validate(Some(&FieldValue::Date(tomorrow))).is_err());
    }

    #[test]
    fn pattern_rule() {
        let rule = Rule::pattern(r"^PID\d+$", "must look like PID12345").unwrap();
        assert!(rule.check(&FieldValue::Text("PID12345".into())).is_ok());
        assert_eq!(
            rule.check(&FieldValue::Text("12345".into())).unwrap_err(),
            "must look like PID12345"
        );
    }

    #[test]
    fn invalid_pattern_is_a_definition_error() {
        let err = Rule::pattern("PID(", "must look like PID12345").unwrap_err();
        assert!(matches!(err, IntakeError::Definition(_)));
    }

    #[test]
    fn pattern_rule_json_carries_source_text() {
        let rule = Rule::pattern(r"^\d{5}$", "must be a ZIP code").unwrap();
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"rule": "pattern", "regex": r"^\d{5}$", "message": "must be a ZIP code"})
        );
        assert_eq!(serde_json::from_value::<Rule>(json).unwrap(), rule);

        let bad = serde_json::json!({"rule": "pattern", "regex": "[", "message": "x"});
        assert!(serde_json::from_value::<Rule>(bad).is_err());
    }

    #[test]
    fn wrong_variant_in_store_fails_validation() {
        let field = Field::number("income", "Income").required();
        assert!(field.validate(Some(&FieldValue::Text("100".into()))).is_err());
    }

    #[test]
    fn display_formats_values() {
        assert_eq!(FieldValue::Number(1200.0).to_string(), "1200");
        assert_eq!(FieldValue::Number(12.5).to_string(), "12.5");
        assert_eq!(
            FieldValue::Date(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()).to_string(),
            "1990-01-01"
        );
    }

    #[test]
    fn field_value_serde_is_tagged() {
        let json = serde_json::to_value(FieldValue::Number(3.0)).unwrap();
        assert_eq!(json, json!({"type": "number", "value": 3.0}));
    }
}
