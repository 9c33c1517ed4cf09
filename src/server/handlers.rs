use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use tracing::info;

use crate::error::PrefsError;
use crate::server::render::{self, FormTemplate, MessageTemplate};
use crate::server::router::PrefsState;

/// Decoded query string or form body. Repeated keys are kept; lookups take the first.
type Pairs = Vec<(String, String)>;

fn first<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// A checked box (`subscribe=1`) keeps the subscription; anything else opts out.
pub fn optout_from(subscribe: Option<&str>) -> bool {
    subscribe != Some("1")
}

/// GET /preferences -> the form, pre-filled with the escaped `email` query value.
pub async fn preferences_form(Query(query): Query<Pairs>) -> Response {
    let email = first(&query, "email").unwrap_or_default();
    render::page(StatusCode::OK, &FormTemplate::new(email))
}

/// POST /preferences -> apply the submitted preference.
pub async fn update_preferences(
    State(state): State<PrefsState>,
    Form(form): Form<Pairs>,
) -> Result<Response, PrefsError> {
    let optout = optout_from(first(&form, "subscribe"));
    let email = first(&form, "email")
        .filter(|email| !email.is_empty())
        .ok_or(PrefsError::MissingEmail)?;

    state.store.set_opt_out(email, optout).await?;

    info!(optout, "Preference update accepted");
    Ok(render::page(StatusCode::OK, &MessageTemplate::success()))
}
