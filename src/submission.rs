//! Submission types - the canonical shape of a captured lead
//!
//! A submission starts life as an untrusted [`RawSubmission`] decoded from the
//! request body, is combined with a [`RequestContext`] taken from the
//! connection, and becomes an immutable [`SubmissionRecord`] once it passes
//! validation.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Which form on the site produced the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormType {
    /// The full enquiry form
    #[default]
    Enquiry,
    /// The auto-triggered lead capture modal
    Popup,
    /// The brochure download gate
    Brochure,
}

impl FormType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::Enquiry => "enquiry",
            FormType::Popup => "popup",
            FormType::Brochure => "brochure",
        }
    }

    /// Parse a client supplied value, falling back to `Enquiry` for anything
    /// absent or unrecognised.
    pub fn from_client(value: Option<&str>) -> Self {
        match value {
            Some(v) => v.parse().unwrap_or_else(|_| {
                tracing::debug!("Unknown form_type {:?}, using enquiry", v);
                FormType::Enquiry
            }),
            None => FormType::Enquiry,
        }
    }
}

impl FromStr for FormType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enquiry" => Ok(FormType::Enquiry),
            "popup" => Ok(FormType::Popup),
            "brochure" => Ok(FormType::Brochure),
            other => Err(format!("Unknown form type: {}", other)),
        }
    }
}

impl std::fmt::Display for FormType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Client supplied fields, decoded leniently from an untrusted payload.
///
/// Blank strings, `null` and non-scalar values are treated as absent.
/// Numbers are kept in their textual form so a phone number sent as a JSON
/// number still counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSubmission {
    pub form_type: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub programme: Option<String>,
    pub city: Option<String>,
    pub enroll_timeline: Option<String>,
    pub enquiry_type: Option<String>,
    pub page_url: Option<String>,
    pub consent: bool,
}

impl RawSubmission {
    /// Decode a JSON body. Anything other than an object yields an empty
    /// submission, which then fails validation.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Self::default(),
        }
    }

    /// Decode urlencoded form pairs. Later duplicates win.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let map: Map<String, Value> = pairs
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        Self::from_map(&map)
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        let text = |key: &str| map.get(key).and_then(text_value);
        Self {
            form_type: text("form_type"),
            first_name: text("first_name"),
            last_name: text("last_name"),
            email: text("email"),
            phone: text("phone"),
            programme: text("programme"),
            city: text("city"),
            enroll_timeline: text("enroll_timeline"),
            enquiry_type: text("enquiry_type"),
            page_url: text("page_url"),
            consent: map.get("consent").map(truthy).unwrap_or(false),
        }
    }

    pub fn has_contact(&self) -> bool {
        self.email.is_some() || self.phone.is_some()
    }
}

fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            let s = s.trim();
            !s.is_empty()
                && !["false", "0", "off", "no"]
                    .iter()
                    .any(|f| s.eq_ignore_ascii_case(f))
        }
        _ => false,
    }
}

/// Metadata taken from the connection, never from the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self { ip_address, user_agent }
    }
}

/// One captured lead.
///
/// Built once at ingestion and never modified afterwards. Serialized form is
/// the File Store's on-disk shape: absent fields are omitted, `consent` is
/// written as `0`/`1` like the table column, `created_at` as RFC 3339.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    #[serde(default)]
    pub form_type: FormType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enroll_timeline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enquiry_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[serde(default, with = "consent_flag")]
    pub consent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SubmissionRecord {
    /// Validate a raw submission and stamp it with request metadata.
    ///
    /// Fails with [`Error::MissingContact`] when neither email nor phone is
    /// present; nothing has been persisted at that point.
    pub fn from_raw(raw: RawSubmission, ctx: RequestContext) -> Result<Self> {
        if !raw.has_contact() {
            return Err(Error::MissingContact);
        }

        Ok(Self {
            form_type: FormType::from_client(raw.form_type.as_deref()),
            first_name: raw.first_name,
            last_name: raw.last_name,
            email: raw.email,
            phone: raw.phone,
            programme: raw.programme,
            city: raw.city,
            enroll_timeline: raw.enroll_timeline,
            enquiry_type: raw.enquiry_type,
            page_url: raw.page_url,
            consent: raw.consent,
            ip_address: ctx.ip_address,
            user_agent: ctx.user_agent,
            created_at: Utc::now(),
        })
    }
}

mod consent_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match Flag::deserialize(deserializer)? {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> RequestContext {
        RequestContext::new(Some("10.0.0.7".into()), Some("Mozilla/5.0".into()))
    }

    #[test]
    fn test_form_type_roundtrip() {
        for kind in [FormType::Enquiry, FormType::Popup, FormType::Brochure] {
            let parsed: FormType = kind.as_str().parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_form_type_defaults_to_enquiry() {
        assert_eq!(FormType::from_client(None), FormType::Enquiry);
        assert_eq!(FormType::from_client(Some("webinar")), FormType::Enquiry);
        assert_eq!(FormType::from_client(Some("Brochure")), FormType::Brochure);
    }

    #[test]
    fn test_missing_contact_is_rejected() {
        let raw = RawSubmission::from_json(&json!({"first_name": "Bob"}));
        let err = SubmissionRecord::from_raw(raw, ctx()).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Email or phone is required.");
    }

    #[test]
    fn test_blank_contact_is_rejected() {
        let raw = RawSubmission::from_json(&json!({"email": "", "phone": "   ", "consent": true}));
        assert!(SubmissionRecord::from_raw(raw, ctx()).is_err());
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        let raw = RawSubmission::from_json(&json!(["a@x.com"]));
        assert!(!raw.has_contact());
    }

    #[test]
    fn test_phone_only_is_accepted() {
        let raw = RawSubmission::from_json(&json!({"phone": 9876543210u64}));
        let record = SubmissionRecord::from_raw(raw, ctx()).unwrap();
        assert_eq!(record.phone.as_deref(), Some("9876543210"));
        assert_eq!(record.form_type, FormType::Enquiry);
        assert!(!record.consent);
    }

    #[test]
    fn test_context_overrides_payload() {
        let raw = RawSubmission::from_json(&json!({
            "email": "a@x.com",
            "ip_address": "6.6.6.6",
            "user_agent": "spoofed",
        }));
        let record = SubmissionRecord::from_raw(raw, ctx()).unwrap();
        assert_eq!(record.ip_address.as_deref(), Some("10.0.0.7"));
        assert_eq!(record.user_agent.as_deref(), Some("Mozilla/5.0"));
    }

    #[test]
    fn test_consent_truthiness() {
        let consent = |v: Value| RawSubmission::from_json(&json!({ "consent": v })).consent;
        assert!(consent(json!(true)));
        assert!(consent(json!(1)));
        assert!(consent(json!("on")));
        assert!(!consent(json!(false)));
        assert!(!consent(json!(0)));
        assert!(!consent(json!("false")));
        assert!(!consent(json!("")));
        assert!(!consent(json!(null)));
    }

    #[test]
    fn test_form_pairs() {
        let raw = RawSubmission::from_pairs(vec![
            ("form_type".to_string(), "popup".to_string()),
            ("email".to_string(), "a@x.com".to_string()),
            ("consent".to_string(), "on".to_string()),
        ]);
        assert_eq!(raw.form_type.as_deref(), Some("popup"));
        assert!(raw.consent);
        assert!(raw.has_contact());
    }

    #[test]
    fn test_record_file_shape() {
        let raw = RawSubmission::from_json(&json!({
            "form_type": "brochure",
            "first_name": "Asha",
            "email": "a@x.com",
            "consent": true,
        }));
        let record = SubmissionRecord::from_raw(raw, ctx()).unwrap();
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["form_type"], "brochure");
        assert_eq!(value["consent"], 1);
        assert!(value.get("last_name").is_none());
        assert!(value["created_at"].is_string());

        let back: SubmissionRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
