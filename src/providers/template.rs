//! Message template rendering.
//!
//! Templates are plain strings with `{placeholder}` markers. Rendering never
//! fails: a missing template falls back to [`FALLBACK_OTP_EMAIL`] and
//! unknown placeholders are left in place, so a broken template set can
//! degrade the message but never abort a verification flow.

use std::collections::HashMap;

/// Built-in OTP email body used when no named template is registered.
pub const FALLBACK_OTP_EMAIL: &str = "\
<html>
<body style=\"font-family: Arial, sans-serif; color: #333;\">
  <h2>Verification Code</h2>
  <p>Dear {customer_name},</p>
  <p>Your verification code is:</p>
  <p style=\"font-size: 28px; font-weight: bold; letter-spacing: 4px;\">{otp}</p>
  <p>This code expires in {expiry_minutes} minutes.</p>
  <p>If you did not request this code, please contact support immediately.</p>
  <p>Do not share this code with anyone.</p>
</body>
</html>";

/// Named message templates with placeholder substitution.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: HashMap<String, String>,
}

impl TemplateSet {
    /// Creates an empty template set. Rendering will use the fallback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a template body under a name.
    #[must_use]
    pub fn with_template(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.templates.insert(name.into(), body.into());
        self
    }

    /// Renders the named template, substituting `{key}` markers.
    ///
    /// Falls back to [`FALLBACK_OTP_EMAIL`] when the name is unknown.
    #[must_use]
    pub fn render(&self, name: &str, vars: &[(&str, &str)]) -> String {
        let body = self
            .templates
            .get(name)
            .map_or(FALLBACK_OTP_EMAIL, String::as_str);
        let mut rendered = body.to_string();
        for (key, value) in vars {
            rendered = rendered.replace(&format!("{{{key}}}"), value);
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_registered_template() {
        let templates = TemplateSet::new()
            .with_template("otp_email", "Hello {customer_name}, code {otp}");
        let out = templates.render("otp_email", &[("customer_name", "Anna"), ("otp", "123456")]);
        assert_eq!(out, "Hello Anna, code 123456");
    }

    #[test]
    fn missing_template_uses_fallback() {
        let templates = TemplateSet::new();
        let out = templates.render(
            "otp_email",
            &[("customer_name", "Anna"), ("otp", "123456"), ("expiry_minutes", "3")],
        );
        assert!(out.contains("123456"));
        assert!(out.contains("Dear Anna"));
        assert!(out.contains("3 minutes"));
    }

    #[test]
    fn unknown_placeholders_are_left_in_place() {
        let templates = TemplateSet::new().with_template("t", "code {otp} for {unknown}");
        let out = templates.render("t", &[("otp", "000111")]);
        assert_eq!(out, "code 000111 for {unknown}");
    }
}
