// 激活码数据模型

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use crate::models::membership::{MembershipSnapshot, MembershipType};
use crate::models::PaginationInfo;

/// 激活码
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct ActivationCode {
    pub id: Uuid,
    /// 激活码字符串 (唯一)
    pub code: String,
    /// 兑换的会员等级
    pub membership_type: MembershipType,
    /// 是否已激活 (只能从 false 变为 true 一次)
    pub is_activated: bool,
    pub activated_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub usage_count: i32,
    /// 兑换账号
    pub redeemed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ActivationCode {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// 激活码审计日志动作
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq)]
#[sqlx(type_name = "varchar")]
#[serde(rename_all = "lowercase")]
pub enum ActivationAction {
    #[sqlx(rename = "generated")]
    Generated,
    #[sqlx(rename = "activated")]
    Activated,
}

/// 激活请求
#[derive(Debug, Deserialize)]
pub struct RedeemCodeRequest {
    pub code: Option<String>,
}

/// 激活响应
#[derive(Debug, Serialize)]
pub struct RedeemCodeResponse {
    pub success: bool,
    pub message: String,
    pub membership: MembershipSnapshot,
}

/// 管理员批量生成激活码请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodesRequest {
    #[serde(rename = "type")]
    pub membership_type: Option<String>,
    pub count: Option<u32>,
    pub expires_in_days: Option<i64>,
}

/// 生成的激活码概要
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCode {
    pub id: Uuid,
    pub code: String,
    #[serde(rename = "type")]
    pub membership_type: MembershipType,
    pub expires_at: DateTime<Utc>,
}

impl From<ActivationCode> for GeneratedCode {
    fn from(code: ActivationCode) -> Self {
        Self {
            id: code.id,
            code: code.code,
            membership_type: code.membership_type,
            expires_at: code.expires_at,
        }
    }
}

/// 生成激活码响应
#[derive(Debug, Serialize)]
pub struct GenerateCodesResponse {
    pub success: bool,
    pub message: String,
    pub codes: Vec<GeneratedCode>,
}

/// 管理员激活码列表查询参数
#[derive(Debug, Deserialize, Default)]
pub struct CodeListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// 会员等级过滤
    #[serde(rename = "type")]
    pub membership_type: Option<String>,
    /// activated | unactivated
    pub status: Option<String>,
}

impl CodeListQuery {
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

/// 管理员视角的激活码 (附最近一条审计日志)
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminCodeView {
    pub id: Uuid,
    pub code: String,
    #[serde(rename = "type")]
    pub membership_type: MembershipType,
    pub is_activated: bool,
    pub activated_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub usage_count: i32,
    pub redeemed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub latest_log_action: Option<ActivationAction>,
    pub latest_log_details: Option<String>,
    pub latest_log_at: Option<DateTime<Utc>>,
}

/// 激活码分页列表
#[derive(Debug, Serialize)]
pub struct CodePage {
    pub codes: Vec<AdminCodeView>,
    pub pagination: PaginationInfo,
}
