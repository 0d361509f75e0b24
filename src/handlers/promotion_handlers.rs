// 推广中心API处理器
// 推广数据面板、提现申请、提现记录

use actix_web::{web, HttpResponse};
use crate::error::AppResult;
use crate::middleware::CurrentAccount;
use crate::models::{
    CreateWithdrawalRequest, CreateWithdrawalResponse, DataResponse, PromotionDashboardResponse,
    WithdrawalListQuery,
};
use crate::services::{PromotionService, WithdrawalService};
use crate::state::AppState;

/// 推广中心数据
///
/// GET /promotion/me
///
/// 需要登录
/// 响应: {"success": true, "data": PromotionDashboard}
pub async fn get_dashboard(
    data: web::Data<AppState>,
    account: CurrentAccount,
) -> AppResult<HttpResponse> {
    let dashboard = PromotionService::new(data.db_pool.clone(), data.config.promotion.site_url.clone())
        .dashboard(account.id())
        .await?;

    Ok(HttpResponse::Ok().json(PromotionDashboardResponse {
        success: true,
        data: dashboard,
    }))
}

/// 申请提现
///
/// POST /promotion/withdraw
///
/// 需要登录
/// 请求体: {"amount": 100, "paymentMethod": "wechat", "paymentCode": "..."}
/// 响应: CreateWithdrawalResponse
pub async fn request_withdrawal(
    data: web::Data<AppState>,
    account: CurrentAccount,
    request: web::Json<CreateWithdrawalRequest>,
) -> AppResult<HttpResponse> {
    let withdrawal = WithdrawalService::new(data.db_pool.clone(), data.config.promotion.min_withdrawal)
        .request_from(account.id(), request.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(CreateWithdrawalResponse {
        success: true,
        message: "提现申请已提交，请等待审核".to_string(),
        withdrawal: withdrawal.to_response(),
    }))
}

/// 我的提现记录
///
/// GET /promotion/withdrawals?page=1&limit=10
///
/// 需要登录
/// 响应: {"success": true, "data": {"withdrawals": [...], "pagination": {...}}}
pub async fn list_my_withdrawals(
    data: web::Data<AppState>,
    account: CurrentAccount,
    query: web::Query<WithdrawalListQuery>,
) -> AppResult<HttpResponse> {
    let page = WithdrawalService::new(data.db_pool.clone(), data.config.promotion.min_withdrawal)
        .list_for_promoter(account.id(), &query)
        .await?;

    Ok(HttpResponse::Ok().json(DataResponse::new(page)))
}
