//! HTML pages for the preference form, rendered from `templates/`.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::error;

#[derive(Template)]
#[template(path = "form.html")]
pub struct FormTemplate {
    /// Already escaped by [`escape_html`]; inserted verbatim.
    email: String,
}

impl FormTemplate {
    pub fn new(raw_email: &str) -> Self {
        Self {
            email: escape_html(raw_email),
        }
    }
}

#[derive(Template)]
#[template(path = "message.html")]
pub struct MessageTemplate {
    message: &'static str,
}

impl MessageTemplate {
    pub fn success() -> Self {
        Self {
            message: "Thank you for updating your preferences.",
        }
    }

    pub fn error() -> Self {
        Self {
            message: "There was an error updating your preferences.",
        }
    }

    pub fn bad_request() -> Self {
        Self {
            message: "An email address is required.",
        }
    }
}

/// Render `template` with `status`, falling back to a bare 500 if rendering fails.
pub fn page<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            error!(error = %e, "failed to render template");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Escape `&`, `<`, `>`, `"` and `'` for use inside an HTML attribute or text node.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
