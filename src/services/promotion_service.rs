// 推广中心服务
// 汇总推广员的账号信息、推广链接与二维码、被推广用户、最近分润、本月统计和下一个结算日

use sqlx::PgPool;
use uuid::Uuid;
use chrono::{Local, TimeZone, Utc};
use rust_decimal::Decimal;
use crate::error::{AppError, AppResult};
use std::collections::HashMap;
use crate::models::{
    MonthlyStats, PaginationInfo, PendingWithdrawal, PromoterCommission, PromoterListQuery,
    PromoterPage, PromoterRow, PromotionDashboard, RecentCommission, WithdrawalStatus,
};
use crate::services::account_service::find_account;
use crate::services::ReferralService;
use crate::utils::{generate_promotion_qr_code, next_settlement_date, start_of_month};

/// 最近分润展示条数
const RECENT_COMMISSION_LIMIT: i64 = 10;
/// 管理员推广员列表中每人展示的分润条数
const PROMOTER_COMMISSION_LIMIT: i64 = 5;

/// 推广中心服务
pub struct PromotionService {
    pool: PgPool,
    site_url: String,
}

impl PromotionService {
    pub fn new(pool: PgPool, site_url: String) -> Self {
        Self { pool, site_url }
    }

    /// 推广链接
    pub fn promotion_link(&self, promotion_code: &str) -> String {
        format!("{}?ref={}", self.site_url.trim_end_matches('/'), promotion_code)
    }

    /// 获取推广中心数据
    pub async fn dashboard(&self, account_id: Uuid) -> AppResult<PromotionDashboard> {
        let account = find_account(&self.pool, account_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("账号不存在"))?;

        let promotion_link = self.promotion_link(&account.promotion_code);

        // 二维码生成失败不影响其他数据
        let promotion_qr_code = match generate_promotion_qr_code(&promotion_link) {
            Ok(qr_code) => Some(qr_code),
            Err(e) => {
                log::warn!("Failed to generate promotion QR code for {}: {}", account_id, e);
                None
            }
        };

        let promoted_users = ReferralService::new(self.pool.clone())
            .promoted_users(account_id)
            .await?;
        let recent_commissions = self.recent_commissions(account_id).await?;
        let monthly_stats = self.monthly_stats(account_id).await?;

        Ok(PromotionDashboard {
            account: account.to_summary(),
            promotion_link,
            promotion_qr_code,
            promoted_users,
            recent_commissions,
            monthly_stats,
            next_settlement_date: next_settlement_date(Local::now().date_naive()),
        })
    }

    /// 最近的分润记录
    pub async fn recent_commissions(&self, promoter_id: Uuid) -> AppResult<Vec<RecentCommission>> {
        let commissions = sqlx::query_as::<_, RecentCommission>(
            r#"
            SELECT id, amount, membership_type, membership_price, rate, created_at
            FROM commission_records
            WHERE promoter_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(promoter_id)
        .bind(RECENT_COMMISSION_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(commissions)
    }

    /// 本月 (本地时区) 分润汇总
    pub async fn monthly_stats(&self, promoter_id: Uuid) -> AppResult<MonthlyStats> {
        let month_start = start_of_month(Local::now().date_naive())
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| Local.from_local_datetime(&naive).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let (total_amount, total_count): (Option<Decimal>, i64) = sqlx::query_as(
            r#"
            SELECT SUM(amount), COUNT(*)
            FROM commission_records
            WHERE promoter_id = $1 AND created_at >= $2
            "#,
        )
        .bind(promoter_id)
        .bind(month_start)
        .fetch_one(&self.pool)
        .await?;

        Ok(MonthlyStats {
            total_amount: total_amount.unwrap_or(Decimal::ZERO),
            total_count,
        })
    }

    /// 有收益的推广员列表 (按累计收益倒序)
    ///
    /// 每个推广员附带被推广人数、最近5条分润和待处理提现
    pub async fn list_promoters(&self, query: &PromoterListQuery) -> AppResult<PromoterPage> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE total_earnings > 0")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, PromoterRow>(
            r#"
            SELECT a.id, a.username, a.email, a.promotion_code, a.total_earnings,
                   a.available_balance, a.total_promotions,
                   (SELECT COUNT(*) FROM promotion_relations r WHERE r.promoter_id = a.id) AS promoted_users_count
            FROM accounts a
            WHERE a.total_earnings > 0
            ORDER BY a.total_earnings DESC, a.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(query.limit() as i64)
        .bind(query.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();

        let commissions = sqlx::query_as::<_, PromoterCommission>(
            r#"
            SELECT promoter_id, id, amount, membership_type, created_at
            FROM (
                SELECT promoter_id, id, amount, membership_type, created_at,
                       ROW_NUMBER() OVER (PARTITION BY promoter_id ORDER BY created_at DESC) AS rn
                FROM commission_records
                WHERE promoter_id = ANY($1) AND status = 'confirmed'
            ) ranked
            WHERE rn <= $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(&ids)
        .bind(PROMOTER_COMMISSION_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let withdrawals = sqlx::query_as::<_, PendingWithdrawal>(
            r#"
            SELECT promoter_id, id, amount, payment_method, payment_code, created_at
            FROM withdrawals
            WHERE promoter_id = ANY($1) AND status = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(&ids)
        .bind(WithdrawalStatus::Pending)
        .fetch_all(&self.pool)
        .await?;

        let mut commissions_by_promoter: HashMap<Uuid, Vec<PromoterCommission>> = HashMap::new();
        for commission in commissions {
            commissions_by_promoter.entry(commission.promoter_id).or_default().push(commission);
        }
        let mut withdrawals_by_promoter: HashMap<Uuid, Vec<PendingWithdrawal>> = HashMap::new();
        for withdrawal in withdrawals {
            withdrawals_by_promoter.entry(withdrawal.promoter_id).or_default().push(withdrawal);
        }

        let promoters = rows
            .into_iter()
            .map(|row| {
                let recent = commissions_by_promoter.remove(&row.id).unwrap_or_default();
                let pending = withdrawals_by_promoter.remove(&row.id).unwrap_or_default();
                row.into_overview(recent, pending)
            })
            .collect();

        Ok(PromoterPage {
            promoters,
            pagination: PaginationInfo::new(query.page(), query.limit(), total as u64),
        })
    }
}
