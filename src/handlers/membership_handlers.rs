// 会员API处理器
// 查询当前会员、扣减下载次数

use actix_web::{web, HttpResponse};
use crate::error::AppResult;
use crate::middleware::CurrentAccount;
use crate::models::{ConsumeDownloadResponse, CurrentMembershipResponse};
use crate::services::MembershipService;
use crate::state::AppState;

/// 获取当前会员
///
/// GET /memberships/user
///
/// 需要登录
/// 响应: {"hasMembership": bool, "membership": MembershipDetail | null}
pub async fn get_current_membership(
    data: web::Data<AppState>,
    account: CurrentAccount,
) -> AppResult<HttpResponse> {
    let membership = MembershipService::new(data.db_pool.clone())
        .get_active(account.id())
        .await?;

    Ok(HttpResponse::Ok().json(CurrentMembershipResponse {
        has_membership: membership.is_some(),
        membership: membership.as_ref().map(|m| m.to_detail()),
    }))
}

/// 扣减一次下载次数
///
/// POST /memberships/user/downloads
///
/// 需要登录
/// 响应: ConsumeDownloadResponse
pub async fn consume_download(
    data: web::Data<AppState>,
    account: CurrentAccount,
) -> AppResult<HttpResponse> {
    let membership = MembershipService::new(data.db_pool.clone())
        .consume_download_for_owner(account.id())
        .await?;

    Ok(HttpResponse::Ok().json(ConsumeDownloadResponse {
        success: true,
        membership_id: membership.id,
        remaining_downloads: membership.remaining_downloads,
    }))
}
