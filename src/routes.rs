// API路由配置
// 定义所有HTTP接口的路由规则

use actix_web::{error::InternalError, web, HttpResponse, Scope};
use crate::handlers::*;
use crate::models::ErrorResponse;

/// 注册全部路由
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(public_routes())
        .service(auth_routes())
        .service(activation_routes())
        .service(membership_routes())
        .service(promotion_routes())
        .service(admin_routes());
}

/// 请求体解析失败时返回 {"error": "..."}
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| {
            log::warn!("Invalid JSON payload: {}", err);
            let response = HttpResponse::BadRequest().json(ErrorResponse::new("请求参数格式错误"));
            InternalError::from_response(err, response).into()
        })
}

/// 查询参数解析失败时返回 {"error": "..."}
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(ErrorResponse::new("查询参数格式错误"));
        InternalError::from_response(err, response).into()
    })
}

/// 账号路由
fn auth_routes() -> Scope {
    web::scope("/auth")
        .route("/register", web::post().to(register))
        .route("/login", web::post().to(login))
}

/// 激活码路由
fn activation_routes() -> Scope {
    web::scope("/activation-codes")
        .route("/activate", web::post().to(activate_code))
}

/// 会员路由
fn membership_routes() -> Scope {
    web::scope("/memberships")
        .route("/user", web::get().to(get_current_membership))
        .route("/user/downloads", web::post().to(consume_download))
}

/// 推广中心路由
fn promotion_routes() -> Scope {
    web::scope("/promotion")
        .route("/me", web::get().to(get_dashboard))
        .route("/withdraw", web::post().to(request_withdrawal))
        .route("/withdrawals", web::get().to(list_my_withdrawals))
}

/// 管理员路由
fn admin_routes() -> Scope {
    web::scope("/admin")
        .route("/activation-codes", web::get().to(list_activation_codes))
        .route("/activation-codes/generate", web::post().to(generate_codes))
        .route("/promotion", web::get().to(list_promoters))
        .route("/promotion/withdrawals", web::put().to(update_withdrawal_status))
        .route("/promotion/withdrawals", web::get().to(list_withdrawals))
        .route("/promotion/clear-balance", web::post().to(clear_balance))
}

/// 公共路由 (无需认证)
fn public_routes() -> Scope {
    web::scope("/health").route("", web::get().to(health_check))
}
