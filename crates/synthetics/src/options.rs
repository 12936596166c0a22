//! Encoding of type-conditional monitor settings into the nested `options` document.
//!
//! Which optional fields a monitor type accepts is kept in a single lookup table,
//! [`MonitorType::conditional_fields`]. The service ignores fields that do not apply to
//! a type, so fields illegal for a type are dropped rather than rejected.

use serde::{Deserialize, Serialize};

use crate::models::MonitorType;

/// Monitor fields that are only meaningful for some monitor types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionalField {
    /// `uri`
    Uri,
    /// `options.validationString`
    ValidationString,
    /// `options.verifySSL`
    VerifySsl,
    /// `options.bypassHEADRequest`
    BypassHeadRequest,
    /// `options.treatRedirectAsFailure`
    TreatRedirectAsFailure,
}

impl MonitorType {
    /// Conditional fields accepted by this monitor type.
    pub const fn conditional_fields(self) -> &'static [ConditionalField] {
        use ConditionalField as F;
        match self {
            Self::Simple => &[
                F::Uri,
                F::ValidationString,
                F::VerifySsl,
                F::BypassHeadRequest,
                F::TreatRedirectAsFailure,
            ],
            Self::Browser => &[F::Uri, F::ValidationString, F::VerifySsl],
            Self::ScriptApi | Self::ScriptBrowser => &[],
        }
    }

    /// Whether `field` applies to this monitor type.
    pub fn accepts(self, field: ConditionalField) -> bool {
        self.conditional_fields().contains(&field)
    }
}

/// Tri-state monitor settings. `None` means "not configured" and is never sent.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Text the response must contain
    #[serde(rename = "validationString", default, skip_serializing_if = "Option::is_none")]
    pub validation_string: Option<String>,
    /// Verify the TLS certificate
    #[serde(rename = "verifySSL", default, skip_serializing_if = "Option::is_none")]
    pub verify_ssl: Option<bool>,
    /// Skip the initial HEAD request
    #[serde(rename = "bypassHEADRequest", default, skip_serializing_if = "Option::is_none")]
    pub bypass_head_request: Option<bool>,
    /// Fail the check on redirects
    #[serde(rename = "treatRedirectAsFailure", default, skip_serializing_if = "Option::is_none")]
    pub treat_redirect_as_failure: Option<bool>,
}

impl MonitorOptions {
    /// Whether no option is set.
    pub const fn is_empty(&self) -> bool {
        self.validation_string.is_none()
            && self.verify_ssl.is_none()
            && self.bypass_head_request.is_none()
            && self.treat_redirect_as_failure.is_none()
    }

    /// Drop every option `monitor_type` does not accept.
    pub fn restrict_to(self, monitor_type: MonitorType) -> Self {
        let keep = |field| monitor_type.accepts(field);
        Self {
            validation_string: self
                .validation_string
                .filter(|_| keep(ConditionalField::ValidationString)),
            verify_ssl: self.verify_ssl.filter(|_| keep(ConditionalField::VerifySsl)),
            bypass_head_request: self
                .bypass_head_request
                .filter(|_| keep(ConditionalField::BypassHeadRequest)),
            treat_redirect_as_failure: self
                .treat_redirect_as_failure
                .filter(|_| keep(ConditionalField::TreatRedirectAsFailure)),
        }
    }
}

/// Build the `options` sub-document for a monitor of `monitor_type`.
///
/// Returns `None` when no legal option is set, in which case the `options` key must be
/// left out of the payload entirely.
pub fn encode_options(monitor_type: MonitorType, options: &MonitorOptions) -> Option<MonitorOptions> {
    let restricted = options.clone().restrict_to(monitor_type);
    (!restricted.is_empty()).then_some(restricted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALL_TYPES: [MonitorType; 4] = [
        MonitorType::Simple,
        MonitorType::Browser,
        MonitorType::ScriptApi,
        MonitorType::ScriptBrowser,
    ];

    fn all_set() -> MonitorOptions {
        MonitorOptions {
            validation_string: Some("ok".to_owned()),
            verify_ssl: Some(true),
            bypass_head_request: Some(false),
            treat_redirect_as_failure: Some(true),
        }
    }

    #[test]
    fn simple_keeps_every_option() {
        let encoded = encode_options(MonitorType::Simple, &all_set()).unwrap();
        assert_eq!(
            serde_json::to_value(encoded).unwrap(),
            json!({
                "validationString": "ok",
                "verifySSL": true,
                "bypassHEADRequest": false,
                "treatRedirectAsFailure": true
            })
        );
    }

    #[test]
    fn browser_drops_simple_only_options() {
        let encoded = encode_options(MonitorType::Browser, &all_set()).unwrap();
        assert_eq!(
            serde_json::to_value(encoded).unwrap(),
            json!({"validationString": "ok", "verifySSL": true})
        );
    }

    #[test]
    fn script_types_never_emit_options() {
        let options = MonitorOptions { bypass_head_request: Some(true), ..Default::default() };
        assert_eq!(encode_options(MonitorType::ScriptApi, &options), None);
        assert_eq!(encode_options(MonitorType::ScriptBrowser, &all_set()), None);
    }

    #[test]
    fn unset_is_not_false() {
        let options = MonitorOptions { verify_ssl: Some(false), ..Default::default() };
        let encoded = encode_options(MonitorType::Simple, &options).unwrap();
        assert_eq!(serde_json::to_value(encoded).unwrap(), json!({"verifySSL": false}));
        assert_eq!(encode_options(MonitorType::Simple, &MonitorOptions::default()), None);
    }

    #[test]
    fn no_type_emits_an_illegal_field() {
        for monitor_type in ALL_TYPES {
            let Some(encoded) = encode_options(monitor_type, &all_set()) else {
                assert!(!monitor_type.accepts(ConditionalField::VerifySsl));
                continue;
            };
            let value = serde_json::to_value(encoded).unwrap();
            let object = value.as_object().unwrap();
            assert!(!object.is_empty());
            for (key, field) in [
                ("validationString", ConditionalField::ValidationString),
                ("verifySSL", ConditionalField::VerifySsl),
                ("bypassHEADRequest", ConditionalField::BypassHeadRequest),
                ("treatRedirectAsFailure", ConditionalField::TreatRedirectAsFailure),
            ] {
                assert_eq!(object.contains_key(key), monitor_type.accepts(field), "{key}");
            }
        }
    }

    #[test]
    fn uri_only_for_non_script_types() {
        assert!(MonitorType::Simple.accepts(ConditionalField::Uri));
        assert!(MonitorType::Browser.accepts(ConditionalField::Uri));
        assert!(!MonitorType::ScriptApi.accepts(ConditionalField::Uri));
        assert!(!MonitorType::ScriptBrowser.accepts(ConditionalField::Uri));
    }
}
