// 激活码API处理器
// 用户兑换激活码, 管理员批量生成激活码

use actix_web::{web, HttpResponse};
use crate::error::{AppError, AppResult};
use crate::middleware::{AdminAuth, CurrentAccount};
use crate::models::{
    GenerateCodesRequest, GenerateCodesResponse, GeneratedCode, RedeemCodeRequest,
    RedeemCodeResponse,
};
use crate::services::{ActivationService, CodeService};
use crate::state::AppState;

/// 兑换激活码
///
/// POST /activation-codes/activate
///
/// 需要登录
/// 请求体: {"code": "..."}
/// 响应: RedeemCodeResponse
pub async fn activate_code(
    data: web::Data<AppState>,
    account: CurrentAccount,
    request: web::Json<RedeemCodeRequest>,
) -> AppResult<HttpResponse> {
    let code = request
        .code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::validation("请输入激活码"))?;

    let membership = ActivationService::new(data.db_pool.clone())
        .redeem(code, account.id())
        .await?;

    Ok(HttpResponse::Ok().json(RedeemCodeResponse {
        success: true,
        message: format!("{}激活成功", membership.membership_type.display_name()),
        membership: membership.to_snapshot(),
    }))
}

/// 批量生成激活码
///
/// POST /admin/activation-codes/generate
///
/// 需要管理员令牌
/// 请求体: {"type": "premium", "count": 10, "expiresInDays": 30}
/// 响应: GenerateCodesResponse
pub async fn generate_codes(
    data: web::Data<AppState>,
    _admin: AdminAuth,
    request: web::Json<GenerateCodesRequest>,
) -> AppResult<HttpResponse> {
    let request = request.into_inner();

    let codes = CodeService::new(data.db_pool.clone())
        .generate(
            request.membership_type.as_deref(),
            request.count,
            request.expires_in_days,
        )
        .await?;

    Ok(HttpResponse::Ok().json(GenerateCodesResponse {
        success: true,
        message: format!("成功生成{}个激活码", codes.len()),
        codes: codes.into_iter().map(GeneratedCode::from).collect(),
    }))
}
