// 账号数据模型
// 包含推广码、累计收益、可提现余额等推广相关字段

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// 账号
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// 密码摘要 (不在API响应中返回)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// 本账号的推广码
    pub promotion_code: String,
    /// 累计收益 (只增不减)
    pub total_earnings: Decimal,
    /// 可提现余额
    pub available_balance: Decimal,
    /// 推广人数
    pub total_promotions: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn to_summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            username: self.username.clone(),
            promotion_code: self.promotion_code.clone(),
            total_earnings: self.total_earnings,
            available_balance: self.available_balance,
            total_promotions: self.total_promotions,
        }
    }
}

/// 推广中心展示的账号信息
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: Uuid,
    pub username: String,
    pub promotion_code: String,
    pub total_earnings: Decimal,
    pub available_balance: Decimal,
    pub total_promotions: i32,
}

/// 注册请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// 推广员的推广码 (可选)
    pub promotion_code: Option<String>,
}

/// 注册响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub account: RegisteredAccount,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredAccount {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub promotion_code: String,
    /// 是否成功绑定推广员
    pub referred: bool,
}

/// 登录请求
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// 登录结果 (令牌通过 Cookie 下发)
#[derive(Debug)]
pub struct LoginOutcome {
    pub account: Account,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// 管理员清零余额请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearBalanceRequest {
    pub promoter_id: Option<Uuid>,
}

/// 登录响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    /// 会话令牌, 也可作为 Bearer 令牌使用
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub account: AccountSummary,
}
