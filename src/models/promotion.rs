// 推广与分润数据模型
// 推广关系、分润记录、分润事件 (发件箱) 以及推广中心视图

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use crate::models::account::AccountSummary;
use crate::models::membership::MembershipType;
use crate::models::withdrawal::PaymentMethod;
use crate::models::PaginationInfo;

/// 推广关系 (每个被推广账号最多一条)
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PromotionRelation {
    pub id: Uuid,
    pub promoter_id: Uuid,
    pub referee_id: Uuid,
    pub promotion_code_used: String,
    /// 被推广人累计消费
    pub total_purchase_amount: Decimal,
    /// 该关系累计产生的分润
    pub total_commission: Decimal,
    pub created_at: DateTime<Utc>,
}

/// 分润状态, 当前只有已确认一种
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq)]
#[sqlx(type_name = "varchar")]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    #[sqlx(rename = "confirmed")]
    Confirmed,
}

/// 分润记录 (创建后不再修改)
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct CommissionRecord {
    pub id: Uuid,
    pub promoter_id: Uuid,
    pub referee_id: Uuid,
    pub membership_id: Option<Uuid>,
    /// 幂等键
    pub activation_code_id: Option<Uuid>,
    pub amount: Decimal,
    /// 分润比例快照
    pub rate: Decimal,
    pub membership_type: MembershipType,
    /// 会员价格快照
    pub membership_price: Decimal,
    pub status: CommissionStatus,
    pub confirmed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// 待处理的分润事件, 激活事务内写入
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct CommissionEvent {
    pub id: Uuid,
    pub activation_code_id: Uuid,
    /// 激活会员的账号 (被推广人)
    pub account_id: Uuid,
    pub membership_id: Uuid,
    pub membership_type: MembershipType,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// 分润计算输入
#[derive(Debug, Clone)]
pub struct CommissionRequest {
    pub promoter_id: Uuid,
    pub referee_id: Uuid,
    pub membership_type: MembershipType,
    pub membership_id: Option<Uuid>,
    pub activation_code_id: Option<Uuid>,
}

/// 分润处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum CommissionOutcome {
    /// 已入账
    Credited { record_id: Uuid, amount: Decimal },
    /// 金额为0, 跳过
    Skipped,
    /// 该激活码已处理过
    AlreadyCredited,
}

/// 被推广用户
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PromotedUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub joined_at: DateTime<Utc>,
    pub total_purchase_amount: Decimal,
    pub total_commission: Decimal,
}

/// 最近分润
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecentCommission {
    pub id: Uuid,
    pub amount: Decimal,
    pub membership_type: MembershipType,
    pub membership_price: Decimal,
    pub rate: Decimal,
    pub created_at: DateTime<Utc>,
}

/// 本月分润统计
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyStats {
    pub total_amount: Decimal,
    pub total_count: i64,
}

/// 推广中心数据
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionDashboard {
    pub account: AccountSummary,
    pub promotion_link: String,
    /// 推广链接二维码 (SVG data URL)
    pub promotion_qr_code: Option<String>,
    pub promoted_users: Vec<PromotedUser>,
    pub recent_commissions: Vec<RecentCommission>,
    pub monthly_stats: MonthlyStats,
    pub next_settlement_date: NaiveDate,
}

/// 推广中心响应
#[derive(Debug, Serialize)]
pub struct PromotionDashboardResponse {
    pub success: bool,
    pub data: PromotionDashboard,
}

/// 管理员推广员列表查询参数
#[derive(Debug, Deserialize, Default)]
pub struct PromoterListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PromoterListQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(20).min(100).max(1)
    }

    pub fn offset(&self) -> u32 {
        (self.page() - 1) * self.limit()
    }
}

/// 推广员账号行 (含被推广人数)
#[derive(Debug, FromRow)]
pub struct PromoterRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub promotion_code: String,
    pub total_earnings: Decimal,
    pub available_balance: Decimal,
    pub total_promotions: i32,
    pub promoted_users_count: i64,
}

/// 推广员最近分润
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PromoterCommission {
    #[serde(skip)]
    pub promoter_id: Uuid,
    pub id: Uuid,
    pub amount: Decimal,
    pub membership_type: MembershipType,
    pub created_at: DateTime<Utc>,
}

/// 推广员待处理提现
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PendingWithdrawal {
    #[serde(skip)]
    pub promoter_id: Uuid,
    pub id: Uuid,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_code: String,
    pub created_at: DateTime<Utc>,
}

/// 管理员视角的推广员概览
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoterOverview {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub promotion_code: String,
    pub total_earnings: Decimal,
    pub available_balance: Decimal,
    pub total_promotions: i32,
    pub promoted_users_count: i64,
    pub recent_commissions: Vec<PromoterCommission>,
    pub pending_withdrawals: Vec<PendingWithdrawal>,
}

impl PromoterRow {
    pub fn into_overview(
        self,
        recent_commissions: Vec<PromoterCommission>,
        pending_withdrawals: Vec<PendingWithdrawal>,
    ) -> PromoterOverview {
        PromoterOverview {
            id: self.id,
            username: self.username,
            email: self.email,
            promotion_code: self.promotion_code,
            total_earnings: self.total_earnings,
            available_balance: self.available_balance,
            total_promotions: self.total_promotions,
            promoted_users_count: self.promoted_users_count,
            recent_commissions,
            pending_withdrawals,
        }
    }
}

/// 推广员分页列表
#[derive(Debug, Serialize)]
pub struct PromoterPage {
    pub promoters: Vec<PromoterOverview>,
    pub pagination: PaginationInfo,
}
