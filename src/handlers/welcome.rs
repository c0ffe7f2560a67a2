use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, instrument};

use crate::config::PageConfig;

/// Renders an askama template as an HTML response, or a 500 if rendering fails
pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => {
                error!(error = %err, "Failed to render template");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to render template: {err}"),
                )
                    .into_response()
            }
        }
    }
}

/// Welcome page with the signup form
#[derive(Template)]
#[template(path = "index.html")]
pub struct WelcomeTemplate {
    pub theme: String,
    pub debug: bool,
}

/// Handler for the welcome page (GET /).
#[instrument(name = "welcome", skip(page))]
pub async fn welcome(State(page): State<Arc<PageConfig>>) -> impl IntoResponse {
    HtmlTemplate(WelcomeTemplate {
        theme: page.theme.clone(),
        debug: page.debug,
    })
}
