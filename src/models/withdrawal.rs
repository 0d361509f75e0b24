// 提现申请数据模型
// 提现状态机: pending -> processing -> completed, pending|processing -> rejected

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use crate::models::PaginationInfo;

/// 提现申请
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Withdrawal {
    pub id: Uuid,
    pub promoter_id: Uuid,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    /// 收款码/收款账号
    pub payment_code: String,
    pub status: WithdrawalStatus,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Withdrawal {
    pub fn to_response(&self) -> WithdrawalResponse {
        WithdrawalResponse {
            id: self.id,
            amount: self.amount,
            payment_method: self.payment_method,
            status: self.status,
            remark: self.remark.clone(),
            created_at: self.created_at,
            processed_at: self.processed_at,
            completed_at: self.completed_at,
        }
    }
}

/// 提现状态
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "varchar")]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    /// 待审核
    #[sqlx(rename = "pending")]
    Pending,
    /// 处理中
    #[sqlx(rename = "processing")]
    Processing,
    /// 已打款
    #[sqlx(rename = "completed")]
    Completed,
    /// 已驳回
    #[sqlx(rename = "rejected")]
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Processing => "processing",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WithdrawalStatus::Completed | WithdrawalStatus::Rejected)
    }

    /// 状态机允许的迁移
    pub fn can_transition_to(&self, next: WithdrawalStatus) -> bool {
        use WithdrawalStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Processing, Completed) | (Pending, Rejected) | (Processing, Rejected)
        )
    }
}

impl Default for WithdrawalStatus {
    fn default() -> Self {
        WithdrawalStatus::Pending
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WithdrawalStatus::Pending),
            "processing" => Ok(WithdrawalStatus::Processing),
            "completed" => Ok(WithdrawalStatus::Completed),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            other => Err(format!("unknown withdrawal status: {}", other)),
        }
    }
}

/// 收款方式
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "varchar")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[sqlx(rename = "wechat")]
    Wechat,
    #[sqlx(rename = "alipay")]
    Alipay,
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wechat" => Ok(PaymentMethod::Wechat),
            "alipay" => Ok(PaymentMethod::Alipay),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

/// 提现申请请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWithdrawalRequest {
    pub amount: Option<Decimal>,
    pub payment_method: Option<String>,
    pub payment_code: Option<String>,
}

/// 提现申请响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalResponse {
    pub id: Uuid,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub status: WithdrawalStatus,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CreateWithdrawalResponse {
    pub success: bool,
    pub message: String,
    pub withdrawal: WithdrawalResponse,
}

/// 管理员更新提现状态请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWithdrawalStatusRequest {
    pub withdrawal_id: Option<Uuid>,
    pub status: Option<String>,
    pub remark: Option<String>,
}

/// 提现记录查询参数
#[derive(Debug, Deserialize)]
pub struct WithdrawalListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// 状态过滤 (仅管理员接口)
    pub status: Option<String>,
}

impl WithdrawalListQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(10).min(100).max(1)
    }

    pub fn offset(&self) -> u32 {
        (self.page() - 1) * self.limit()
    }
}

/// 管理员视角的提现记录 (含收款码)
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminWithdrawalView {
    pub id: Uuid,
    pub promoter_id: Uuid,
    pub promoter_username: String,
    pub promoter_email: String,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_code: String,
    pub status: WithdrawalStatus,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct WithdrawalPage<T> {
    pub withdrawals: Vec<T>,
    pub pagination: PaginationInfo,
}
