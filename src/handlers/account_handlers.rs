// 账号API处理器
// 处理注册与登录请求

use actix_web::{web, HttpResponse};
use crate::error::AppResult;
use crate::models::{LoginRequest, LoginResponse, RegisterRequest};
use crate::services::AccountService;
use crate::state::AppState;
use crate::utils::session_cookie;

fn account_service(data: &AppState) -> AccountService {
    AccountService::new(data.db_pool.clone(), data.config.security.password_pepper.clone())
        .with_session_ttl(data.config.security.session_ttl_days)
}

/// 注册账号
///
/// POST /auth/register
///
/// 请求体: RegisterRequest (可携带推广码)
/// 响应: RegisterResponse
pub async fn register(
    data: web::Data<AppState>,
    request: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let response = account_service(&data).register(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

/// 登录
///
/// POST /auth/login
///
/// 请求体: LoginRequest
/// 响应: LoginResponse, 同时下发会话 Cookie
pub async fn login(
    data: web::Data<AppState>,
    request: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let outcome = account_service(&data).login(request.into_inner()).await?;

    let secure = data.config.promotion.site_url.starts_with("https://");
    let cookie = session_cookie(&outcome.token, data.config.security.session_ttl_days, secure);

    Ok(HttpResponse::Ok().cookie(cookie).json(LoginResponse {
        success: true,
        message: "登录成功".to_string(),
        token: outcome.token,
        expires_at: outcome.expires_at,
        account: outcome.account.to_summary(),
    }))
}
