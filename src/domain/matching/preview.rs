//! Rendered notification email

/// HTML body of the notification email as rendered by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailPreview {
    html: String,
}

impl EmailPreview {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}
