// 管理员API处理器
// 提现审核、提现列表、推广员余额清零、激活码列表、推广员列表

use actix_web::{web, HttpResponse};
use crate::error::{AppError, AppResult};
use crate::middleware::AdminAuth;
use crate::models::{
    ClearBalanceRequest, CodeListQuery, DataResponse, PromoterListQuery, SuccessResponse,
    UpdateWithdrawalStatusRequest, WithdrawalListQuery,
};
use crate::services::{AccountService, CodeService, PromotionService, WithdrawalService};
use crate::state::AppState;

/// 更新提现状态
///
/// PUT /admin/promotion/withdrawals
///
/// 需要管理员令牌
/// 请求体: {"withdrawalId": "...", "status": "processing|completed|rejected", "remark": "..."}
/// 响应: SuccessResponse
pub async fn update_withdrawal_status(
    data: web::Data<AppState>,
    _admin: AdminAuth,
    request: web::Json<UpdateWithdrawalStatusRequest>,
) -> AppResult<HttpResponse> {
    let request = request.into_inner();

    let (Some(withdrawal_id), Some(status)) = (request.withdrawal_id, request.status.as_deref()) else {
        return Err(AppError::validation("请提供提现ID和状态"));
    };

    let withdrawal = WithdrawalService::new(data.db_pool.clone(), data.config.promotion.min_withdrawal)
        .set_status(withdrawal_id, status, request.remark.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(SuccessResponse::new(format!(
        "提现状态已更新为{}",
        withdrawal.status
    ))))
}

/// 提现申请列表
///
/// GET /admin/promotion/withdrawals?status=pending&page=1&limit=10
///
/// 需要管理员令牌
/// 响应: {"success": true, "data": {"withdrawals": [...], "pagination": {...}}}
pub async fn list_withdrawals(
    data: web::Data<AppState>,
    _admin: AdminAuth,
    query: web::Query<WithdrawalListQuery>,
) -> AppResult<HttpResponse> {
    let page = WithdrawalService::new(data.db_pool.clone(), data.config.promotion.min_withdrawal)
        .list_all(&query)
        .await?;

    Ok(HttpResponse::Ok().json(DataResponse::new(page)))
}

/// 清零推广员可提现余额
///
/// POST /admin/promotion/clear-balance
///
/// 需要管理员令牌
/// 请求体: {"promoterId": "..."}
/// 响应: SuccessResponse
pub async fn clear_balance(
    data: web::Data<AppState>,
    _admin: AdminAuth,
    request: web::Json<ClearBalanceRequest>,
) -> AppResult<HttpResponse> {
    let promoter_id = request
        .promoter_id
        .ok_or_else(|| AppError::validation("请提供推广员ID"))?;

    let account = AccountService::new(data.db_pool.clone(), data.config.security.password_pepper.clone())
        .clear_balance(promoter_id)
        .await?;

    Ok(HttpResponse::Ok().json(SuccessResponse::new(format!(
        "已清零 {} 的可提现余额",
        account.username
    ))))
}

/// 激活码列表
///
/// GET /admin/activation-codes?type=premium&status=activated&page=1&limit=20
///
/// 需要管理员令牌
/// 响应: {"success": true, "data": {"codes": [...], "pagination": {...}}}
pub async fn list_activation_codes(
    data: web::Data<AppState>,
    _admin: AdminAuth,
    query: web::Query<CodeListQuery>,
) -> AppResult<HttpResponse> {
    let page = CodeService::new(data.db_pool.clone()).list(&query).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(page)))
}

/// 推广员列表
///
/// GET /admin/promotion?page=1&limit=20
///
/// 需要管理员令牌
/// 响应: {"success": true, "data": {"promoters": [...], "pagination": {...}}}
pub async fn list_promoters(
    data: web::Data<AppState>,
    _admin: AdminAuth,
    query: web::Query<PromoterListQuery>,
) -> AppResult<HttpResponse> {
    let page = PromotionService::new(data.db_pool.clone(), data.config.promotion.site_url.clone())
        .list_promoters(&query)
        .await?;

    Ok(HttpResponse::Ok().json(DataResponse::new(page)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use crate::utils::ADMIN_TOKEN_HEADER;

    fn admin_app_state() -> (AppState, String) {
        let state = AppState::new_for_test();
        let token = state.config.security.admin_token.clone();
        (state, token)
    }

    #[actix_web::test]
    async fn test_admin_endpoints_require_token() {
        let (state, _) = admin_app_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/admin/promotion/withdrawals", web::put().to(update_withdrawal_status))
                .route("/admin/promotion/withdrawals", web::get().to(list_withdrawals))
                .route("/admin/promotion/clear-balance", web::post().to(clear_balance)),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/admin/promotion/withdrawals")
            .set_json(serde_json::json!({ "withdrawalId": uuid::Uuid::new_v4(), "status": "processing" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let req = test::TestRequest::get().uri("/admin/promotion/withdrawals").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let req = test::TestRequest::post()
            .uri("/admin/promotion/clear-balance")
            .insert_header((ADMIN_TOKEN_HEADER, "wrong-token-wrong-token"))
            .set_json(serde_json::json!({ "promoterId": uuid::Uuid::new_v4() }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);
    }

    #[actix_web::test]
    async fn test_missing_fields_are_rejected() {
        let (state, token) = admin_app_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/admin/promotion/withdrawals", web::put().to(update_withdrawal_status))
                .route("/admin/promotion/clear-balance", web::post().to(clear_balance)),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/admin/promotion/withdrawals")
            .insert_header((ADMIN_TOKEN_HEADER, token.clone()))
            .set_json(serde_json::json!({ "status": "processing" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "请提供提现ID和状态");

        let req = test::TestRequest::put()
            .uri("/admin/promotion/withdrawals")
            .insert_header((ADMIN_TOKEN_HEADER, token.clone()))
            .set_json(serde_json::json!({ "withdrawalId": uuid::Uuid::new_v4(), "status": "paid" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);

        let req = test::TestRequest::post()
            .uri("/admin/promotion/clear-balance")
            .insert_header((ADMIN_TOKEN_HEADER, token))
            .set_json(serde_json::json!({}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }

    #[actix_web::test]
    async fn test_admin_listings_require_token_and_valid_filters() {
        let (state, token) = admin_app_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/admin/activation-codes", web::get().to(list_activation_codes))
                .route("/admin/promotion", web::get().to(list_promoters)),
        )
        .await;

        let req = test::TestRequest::get().uri("/admin/activation-codes").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let req = test::TestRequest::get().uri("/admin/promotion?page=1&limit=20").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let req = test::TestRequest::get()
            .uri("/admin/activation-codes?status=used")
            .insert_header((ADMIN_TOKEN_HEADER, token.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "无效的状态");

        let req = test::TestRequest::get()
            .uri("/admin/activation-codes?type=gold")
            .insert_header((ADMIN_TOKEN_HEADER, token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "无效的会员类型");
    }
}
