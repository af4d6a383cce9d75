use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::{auth::repo::User, state::AppState};

/// Resolves the session cookie to the authenticated user before any
/// handler logic runs. Handlers receive the full user row.
pub struct CurrentUser(pub User);

/// Picks the named cookie out of a `Cookie` header value.
fn session_token(header: &str, cookie_name: &str) -> Option<Uuid> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name != cookie_name {
            return None;
        }
        value.trim().parse().ok()
    })
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = parts
            .headers
            .get(axum::http::header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing session cookie".to_string(),
            ))?;

        let token = session_token(cookies, &state.config.session.cookie_name).ok_or((
            StatusCode::UNAUTHORIZED,
            "Missing session cookie".to_string(),
        ))?;

        let user = match User::find_by_session(&state.db, token).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                warn!("unknown session token");
                return Err((StatusCode::UNAUTHORIZED, "Invalid session".to_string()));
            }
            Err(e) => {
                error!(error = %e, "session lookup failed");
                return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
            }
        };

        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_named_cookie_out_of_header() {
        let id = Uuid::new_v4();
        let header = format!("theme=dark; sessionId={id}; lang=en");
        assert_eq!(session_token(&header, "sessionId"), Some(id));
    }

    #[test]
    fn ignores_other_cookies() {
        let header = "theme=dark; lang=en";
        assert_eq!(session_token(header, "sessionId"), None);
    }

    #[test]
    fn rejects_malformed_token() {
        let header = "sessionId=not-a-uuid";
        assert_eq!(session_token(header, "sessionId"), None);
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let id = Uuid::new_v4();
        let header = format!("  sessionId = {id} ");
        // Cookie names are matched exactly; a padded name does not resolve.
        assert_eq!(session_token(&header, "sessionId"), None);
        let header = format!("sessionId= {id} ");
        assert_eq!(session_token(&header, "sessionId"), Some(id));
    }
}
