// 认证工具函数
// 从请求中提取会话令牌、管理员令牌, 构造会话 Cookie

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::HttpRequest;

/// 会话 Cookie 名称
pub const SESSION_COOKIE: &str = "account_session_id";

/// 管理员令牌请求头
pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// 从HTTP请求中提取会话令牌
///
/// 优先读取 Cookie, 其次读取 Authorization: Bearer
pub fn extract_session_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    req.headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|auth_str| auth_str.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// 从HTTP请求中提取管理员令牌
pub fn extract_admin_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|header| header.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// 构造会话 Cookie
pub fn session_cookie(token: &str, ttl_days: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::days(ttl_days))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_extract_session_token_from_cookie() {
        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE, "tok123"))
            .to_http_request();
        assert_eq!(extract_session_token(&req).as_deref(), Some("tok123"));
    }

    #[test]
    fn test_extract_session_token_from_bearer() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer abc"))
            .to_http_request();
        assert_eq!(extract_session_token(&req).as_deref(), Some("abc"));

        let req = TestRequest::default().to_http_request();
        assert!(extract_session_token(&req).is_none());
    }

    #[test]
    fn test_extract_admin_token() {
        let req = TestRequest::default()
            .insert_header((ADMIN_TOKEN_HEADER, " secret "))
            .to_http_request();
        assert_eq!(extract_admin_token(&req).as_deref(), Some("secret"));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("tok", 30, false);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.max_age(), Some(CookieDuration::days(30)));
    }
}
