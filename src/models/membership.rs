// 会员数据模型
// 定义会员等级、会员记录以及等级对应的价格、时长、下载额度

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// 无限下载额度标记
pub const UNLIMITED_DOWNLOADS: i32 = -1;

/// 会员等级
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "varchar")]
#[serde(rename_all = "lowercase")]
pub enum MembershipType {
    /// 临时会员
    #[sqlx(rename = "temporary")]
    Temporary,
    /// 普通会员
    #[sqlx(rename = "regular")]
    Regular,
    /// 高级会员
    #[sqlx(rename = "premium")]
    Premium,
    /// 超级会员
    #[sqlx(rename = "super")]
    Super,
}

impl MembershipType {
    pub const ALL: [MembershipType; 4] = [
        MembershipType::Temporary,
        MembershipType::Regular,
        MembershipType::Premium,
        MembershipType::Super,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipType::Temporary => "temporary",
            MembershipType::Regular => "regular",
            MembershipType::Premium => "premium",
            MembershipType::Super => "super",
        }
    }

    /// 展示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            MembershipType::Temporary => "临时会员",
            MembershipType::Regular => "普通会员",
            MembershipType::Premium => "高级会员",
            MembershipType::Super => "超级会员",
        }
    }

    /// 会员价格 (元)
    pub fn price(&self) -> Decimal {
        match self {
            MembershipType::Temporary => Decimal::new(498, 1), // 49.8
            MembershipType::Regular => Decimal::new(398, 0),
            MembershipType::Premium => Decimal::new(998, 0),
            MembershipType::Super => Decimal::new(3999, 0),
        }
    }

    /// 有效天数, None 表示永久
    pub fn duration_days(&self) -> Option<i64> {
        match self {
            MembershipType::Temporary => Some(1),
            MembershipType::Regular => Some(30),
            MembershipType::Premium => Some(365),
            MembershipType::Super => None,
        }
    }

    /// 下载额度, -1 表示无限
    pub fn download_quota(&self) -> i32 {
        match self {
            MembershipType::Temporary => 1,
            MembershipType::Regular => 30,
            MembershipType::Premium | MembershipType::Super => UNLIMITED_DOWNLOADS,
        }
    }

    /// 会员权益说明
    pub fn features(&self) -> &'static [&'static str] {
        match self {
            MembershipType::Temporary => &["市场板块任选1个下载", "远程技术答疑"],
            MembershipType::Regular => &["30个免费下载额度", "专属远程技术支持", "持续更新模板"],
            MembershipType::Premium => &["全场任意下载", "持续更新", "赠变现经验", "24天小白教学课程"],
            MembershipType::Super => &[
                "含高级会员所有权益",
                "赠专属售卖网站",
                "定制客户渠道",
                "全量资源包",
                "变现体系陪跑",
            ],
        }
    }

    /// 根据开始时间计算会员到期时间
    pub fn end_time_from(&self, start_time: DateTime<Utc>) -> DateTime<Utc> {
        match self.duration_days() {
            Some(days) => start_time + Duration::days(days),
            None => permanent_end_time(),
        }
    }
}

/// 永久会员的到期时间
pub fn permanent_end_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2099, 12, 31, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl fmt::Display for MembershipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temporary" => Ok(MembershipType::Temporary),
            "regular" => Ok(MembershipType::Regular),
            "premium" => Ok(MembershipType::Premium),
            "super" => Ok(MembershipType::Super),
            other => Err(format!("unknown membership type: {}", other)),
        }
    }
}

/// 会员状态
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "varchar")]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    #[sqlx(rename = "active")]
    Active,
    #[sqlx(rename = "expired")]
    Expired,
    #[sqlx(rename = "cancelled")]
    Cancelled,
}

impl Default for MembershipStatus {
    fn default() -> Self {
        MembershipStatus::Active
    }
}

/// 会员记录
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Membership {
    pub id: Uuid,
    /// 所属账号
    pub owner_id: Uuid,
    pub membership_type: MembershipType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// 剩余下载次数, -1 为无限
    pub remaining_downloads: i32,
    pub status: MembershipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    /// 是否在指定时间点有效
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == MembershipStatus::Active && self.end_time > now
    }

    pub fn is_unlimited(&self) -> bool {
        self.remaining_downloads == UNLIMITED_DOWNLOADS
    }

    pub fn to_snapshot(&self) -> MembershipSnapshot {
        MembershipSnapshot {
            membership_type: self.membership_type,
            name: self.membership_type.display_name().to_string(),
            end_time: self.end_time,
            remaining_downloads: self.remaining_downloads,
        }
    }

    pub fn to_detail(&self) -> MembershipDetail {
        MembershipDetail {
            id: self.id,
            membership_type: self.membership_type,
            name: self.membership_type.display_name().to_string(),
            price: self.membership_type.price(),
            features: self
                .membership_type
                .features()
                .iter()
                .map(|f| f.to_string())
                .collect(),
            start_time: self.start_time,
            end_time: self.end_time,
            remaining_downloads: self.remaining_downloads,
            is_unlimited: self.is_unlimited(),
        }
    }
}

/// 激活成功后返回的会员快照
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MembershipSnapshot {
    #[serde(rename = "type")]
    pub membership_type: MembershipType,
    pub name: String,
    pub end_time: DateTime<Utc>,
    pub remaining_downloads: i32,
}

/// 当前会员详情
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipDetail {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub membership_type: MembershipType,
    pub name: String,
    pub price: Decimal,
    pub features: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub remaining_downloads: i32,
    pub is_unlimited: bool,
}

/// 当前会员查询响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentMembershipResponse {
    pub has_membership: bool,
    pub membership: Option<MembershipDetail>,
}

/// 下载扣减响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeDownloadResponse {
    pub success: bool,
    pub membership_id: Uuid,
    pub remaining_downloads: i32,
}
