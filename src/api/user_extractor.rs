use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};
use crate::model::UserContext;

/// Axum extractor for UserContext from request headers
///
/// This extractor looks for user information in request headers:
/// - X-User-Id: user identifier
/// - X-User-Name: Optional user display name
/// - X-User-Roles: Optional comma separated role list
///
/// Requests without an id are served as the anonymous user.
#[async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(user_from_headers(&parts.headers))
    }
}

fn user_from_headers(headers: &HeaderMap) -> UserContext {
    let Some(user_id) = extract_header_value(headers, "x-user-id") else {
        return UserContext::anonymous();
    };

    let user_name = extract_header_value(headers, "x-user-name");
    let roles = extract_header_value(headers, "x-user-roles")
        .map(|roles| parse_roles(&roles))
        .unwrap_or_default();

    UserContext::with_details(user_id, user_name, roles)
}

fn parse_roles(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extract header value as string, ignoring blank values
fn extract_header_value(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue};

    #[test]
    fn test_user_context_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-user-id"),
            HeaderValue::from_static("42"),
        );
        headers.insert(
            HeaderName::from_static("x-user-name"),
            HeaderValue::from_static("Alice"),
        );
        headers.insert(
            HeaderName::from_static("x-user-roles"),
            HeaderValue::from_static("authenticated, editor,,"),
        );

        let ctx = user_from_headers(&headers);
        assert_eq!(ctx.user_id, "42");
        assert_eq!(ctx.user_name, Some("Alice".to_string()));
        assert_eq!(ctx.roles, vec!["authenticated".to_string(), "editor".to_string()]);
    }

    #[test]
    fn test_missing_id_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-user-roles"),
            HeaderValue::from_static("administrator"),
        );

        let ctx = user_from_headers(&headers);
        assert!(ctx.is_anonymous());
        assert!(ctx.roles.is_empty());
    }
}
