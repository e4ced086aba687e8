/// Dark-mode preference
///
/// Stored client-side in the `darkMode` cookie. With no cookie, the
/// `Sec-CH-Prefers-Color-Scheme` client hint seeds the value.
///
/// # Endpoints
///
/// - `GET /v1/preferences/theme`
/// - `PUT /v1/preferences/theme` with `{ "dark_mode": true }`

use crate::middleware::session::cookie_value;
use axum::{
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Cookie holding `true` or `false`
pub const THEME_COOKIE: &str = "darkMode";

const COLOR_SCHEME_HINT: &str = "sec-ch-prefers-color-scheme";

/// Theme passed into every view model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Theme {
    pub dark_mode: bool,
}

impl Theme {
    /// Reads the preference from request headers
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let dark_mode = match cookie_value(headers, THEME_COOKIE).as_deref() {
            Some("true") => true,
            Some("false") => false,
            _ => headers
                .get(COLOR_SCHEME_HINT)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim_matches('"').eq_ignore_ascii_case("dark"))
                .unwrap_or(false),
        };
        Self { dark_mode }
    }

    fn cookie(&self) -> String {
        format!(
            "{}={}; Path=/; SameSite=Lax; Max-Age=31536000",
            THEME_COOKIE, self.dark_mode
        )
    }
}

/// Current preference
pub async fn get_theme(headers: HeaderMap) -> Json<Theme> {
    Json(Theme::from_headers(&headers))
}

/// Store a preference
pub async fn set_theme(Json(theme): Json<Theme>) -> Response {
    ([(header::SET_COOKIE, theme.cookie())], Json(theme)).into_response()
}
