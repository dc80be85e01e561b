//! OAuth account-linking stubs
//!
//! The platform's account-linking flow is satisfied with fixed responses:
//! a stub login page, an authorization endpoint that always issues the same
//! code, and a token endpoint that always issues the same bearer tokens.
//! No credential is ever validated.

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{Html, Redirect};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

/// Fixed authorization code issued by `/fakeauth` and `/login`
const AUTH_CODE: &str = "xxxxxx";

/// Fixed token lifetime, one day in seconds
const SECONDS_IN_DAY: u64 = 86_400;

/// Stub account-linking page; the form posts back to `/login`
const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head><title>Hearth Gateway - Link your account</title></head>
  <body>
    <h1>Link your Hearth account</h1>
    <form action="/login" method="post">
      <input type="hidden" name="redirect_uri" value="">
      <input type="hidden" name="state" value="">
      <button type="submit">Link account</button>
    </form>
    <script>
      const params = new URLSearchParams(window.location.search);
      document.querySelector('[name=redirect_uri]').value = params.get('redirect_uri') || '';
      document.querySelector('[name=state]').value = params.get('state') || '';
    </script>
  </body>
</html>
"#;

/// Account-linking redirect parameters
#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    redirect_uri: String,
    #[serde(default)]
    state: String,
}

/// Token request; grant type arrives in the query (GET) or form body (POST)
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    grant_type: Option<String>,
}

/// Serve the stub login page
async fn login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

/// Complete the stub login: bounce back to the caller with the fixed code
async fn login_submit(Form(request): Form<AuthRequest>) -> Redirect {
    redirect_with_code(&request)
}

/// Authorization endpoint: always redirects with the fixed code
async fn fakeauth(Query(request): Query<AuthRequest>) -> Redirect {
    redirect_with_code(&request)
}

fn redirect_with_code(request: &AuthRequest) -> Redirect {
    // The platform double-encodes redirect_uri; decode the inner layer
    let redirect_uri = urlencoding::decode(&request.redirect_uri)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| request.redirect_uri.clone());

    let location = format!("{redirect_uri}?code={AUTH_CODE}&state={}", request.state);
    tracing::debug!(%location, "account link redirect");
    Redirect::to(&location)
}

/// Token endpoint: fixed bearer tokens per grant type
async fn faketoken(Form(request): Form<TokenRequest>) -> (StatusCode, Json<Value>) {
    let grant_type = request.grant_type.as_deref().unwrap_or_default();
    tracing::debug!(grant_type, "token request");

    let body = match grant_type {
        "authorization_code" => json!({
            "token_type": "bearer",
            "access_token": "123access",
            "refresh_token": "123refresh",
            "expires_in": SECONDS_IN_DAY,
        }),
        "refresh_token" => json!({
            "token_type": "bearer",
            "access_token": "123access",
            "expires_in": SECONDS_IN_DAY,
        }),
        other => {
            tracing::warn!(grant_type = other, "unsupported grant type");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "invalid_grant"})),
            );
        }
    };

    (StatusCode::OK, Json(body))
}

/// Build the OAuth stub router
pub fn router() -> Router {
    Router::new()
        .route("/login", get(login_page).post(login_submit))
        .route("/fakeauth", get(fakeauth))
        .route("/faketoken", get(faketoken).post(faketoken))
}
