use serde_json::Value;
use speak_core_types::InboundRequest;
use speak_csrf_rules::section_str;
use subtle::ConstantTimeEq;

use crate::errors::ForgeryError;
use crate::ports::AntiForgery;

pub const DEFAULT_TOKEN_NAME: &str = "__RequestVerificationToken";
pub const DEFAULT_TOKEN_HEADER: &str = "X-RequestVerificationToken";

/// Double-submit check: the token cookie must equal the token sent in the
/// form body or in a request header.
#[derive(Clone, Debug)]
pub struct DoubleSubmitValidator {
    cookie_name: String,
    form_field_name: String,
    header_name: String,
}

impl DoubleSubmitValidator {
    pub fn new(
        cookie_name: impl Into<String>,
        form_field_name: impl Into<String>,
        header_name: impl Into<String>,
    ) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            form_field_name: form_field_name.into(),
            header_name: header_name.into(),
        }
    }

    /// Reads `cookieName`, `formFieldName` and `headerName` from the anti-CSRF
    /// section, keeping defaults for anything absent.
    pub fn from_section(section: &Value) -> Self {
        let defaults = Self::default();
        Self::new(
            section_str(section, "cookieName").unwrap_or(&defaults.cookie_name),
            section_str(section, "formFieldName").unwrap_or(&defaults.form_field_name),
            section_str(section, "headerName").unwrap_or(&defaults.header_name),
        )
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }
}

impl Default for DoubleSubmitValidator {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_NAME, DEFAULT_TOKEN_NAME, DEFAULT_TOKEN_HEADER)
    }
}

impl AntiForgery for DoubleSubmitValidator {
    fn validate(&self, request: &InboundRequest) -> Result<(), ForgeryError> {
        let cookie = request
            .cookie(&self.cookie_name)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ForgeryError::MissingCookie(self.cookie_name.clone()))?;
        let token = request
            .header(&self.header_name)
            .map(str::to_string)
            .or_else(|| request.form_field(&self.form_field_name))
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ForgeryError::MissingToken(self.form_field_name.clone()))?;

        if bool::from(cookie.as_bytes().ct_eq(token.as_bytes())) {
            Ok(())
        } else {
            Err(ForgeryError::Mismatch)
        }
    }
}
