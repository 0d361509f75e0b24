// 提现服务
// 申请时冻结 (扣减) 可提现余额, 驳回时退回; 状态迁移遵循提现状态机

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use chrono::Utc;
use rust_decimal::Decimal;
use crate::error::{AppError, AppResult};
use crate::models::{
    AdminWithdrawalView, CreateWithdrawalRequest, PaginationInfo, PaymentMethod, Withdrawal,
    WithdrawalListQuery, WithdrawalPage, WithdrawalResponse, WithdrawalStatus,
};

const WITHDRAWAL_COLUMNS: &str = "id, promoter_id, amount, payment_method, payment_code, status, \
     remark, created_at, processed_at, completed_at";

/// 提现服务
pub struct WithdrawalService {
    pool: PgPool,
    min_withdrawal: Decimal,
}

impl WithdrawalService {
    pub fn new(pool: PgPool, min_withdrawal: Decimal) -> Self {
        Self { pool, min_withdrawal }
    }

    /// 校验并提交提现申请 (接口入参)
    pub async fn request_from(
        &self,
        promoter_id: Uuid,
        request: CreateWithdrawalRequest,
    ) -> AppResult<Withdrawal> {
        let payment_code = request
            .payment_code
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let payment_method = request
            .payment_method
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let (Some(amount), Some(payment_method), Some(payment_code)) =
            (request.amount, payment_method, payment_code)
        else {
            return Err(AppError::validation("请填写所有必填字段"));
        };

        let payment_method: PaymentMethod = payment_method
            .parse()
            .map_err(|_| AppError::validation("无效的支付方式"))?;

        self.request(promoter_id, amount, payment_method, payment_code).await
    }

    /// 提交提现申请
    ///
    /// 先校验最小金额, 再在同一事务内扣减余额并写入待审核申请
    pub async fn request(
        &self,
        promoter_id: Uuid,
        amount: Decimal,
        payment_method: PaymentMethod,
        payment_code: &str,
    ) -> AppResult<Withdrawal> {
        if amount.scale() > 2 && amount != amount.round_dp(2) {
            return Err(AppError::validation("提现金额最多保留两位小数"));
        }

        if amount < self.min_withdrawal {
            return Err(AppError::BelowMinimumWithdrawal(self.min_withdrawal));
        }

        if payment_code.chars().count() > 255 {
            return Err(AppError::validation("收款码过长"));
        }

        let mut tx = self.pool.begin().await?;

        // 条件扣减: 余额不足时不更新任何行
        let debited = sqlx::query_scalar::<_, Decimal>(
            r#"
            UPDATE accounts
            SET available_balance = available_balance - $1, updated_at = NOW()
            WHERE id = $2 AND available_balance >= $1
            RETURNING available_balance
            "#,
        )
        .bind(amount)
        .bind(promoter_id)
        .fetch_optional(&mut *tx)
        .await?;

        if debited.is_none() {
            let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts WHERE id = $1")
                .bind(promoter_id)
                .fetch_one(&mut *tx)
                .await?;

            return Err(if exists == 0 {
                AppError::not_found("账号不存在")
            } else {
                AppError::InsufficientBalance
            });
        }

        let sql = format!(
            r#"
            INSERT INTO withdrawals (id, promoter_id, amount, payment_method, payment_code, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            WITHDRAWAL_COLUMNS
        );

        let withdrawal = sqlx::query_as::<_, Withdrawal>(&sql)
            .bind(Uuid::new_v4())
            .bind(promoter_id)
            .bind(amount)
            .bind(payment_method)
            .bind(payment_code)
            .bind(WithdrawalStatus::Pending)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        log::info!(
            "Promoter {} requested withdrawal {} of {}",
            promoter_id, withdrawal.id, amount
        );

        Ok(withdrawal)
    }

    /// 管理员更新提现状态
    ///
    /// 总是记录处理时间; 完成或驳回时记录完成时间; 驳回时退回余额
    pub async fn set_status(
        &self,
        withdrawal_id: Uuid,
        status: &str,
        remark: Option<&str>,
    ) -> AppResult<Withdrawal> {
        let next: WithdrawalStatus = status
            .trim()
            .parse()
            .map_err(|_| AppError::validation("无效的状态"))?;
        let remark = remark.map(str::trim).filter(|value| !value.is_empty());

        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {} FROM withdrawals WHERE id = $1 FOR UPDATE",
            WITHDRAWAL_COLUMNS
        );
        let current = sqlx::query_as::<_, Withdrawal>(&sql)
            .bind(withdrawal_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("提现申请不存在"))?;

        if !current.status.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                from: current.status.to_string(),
                to: next.to_string(),
            });
        }

        if next == WithdrawalStatus::Rejected {
            sqlx::query(
                r#"
                UPDATE accounts
                SET available_balance = available_balance + $1, updated_at = NOW()
                WHERE id = $2
                "#,
            )
            .bind(current.amount)
            .bind(current.promoter_id)
            .execute(&mut *tx)
            .await?;
        }

        let now = Utc::now();
        let completed_at = next.is_terminal().then_some(now);

        let sql = format!(
            r#"
            UPDATE withdrawals
            SET status = $2,
                remark = COALESCE($3, remark),
                processed_at = $4,
                completed_at = COALESCE($5, completed_at)
            WHERE id = $1
            RETURNING {}
            "#,
            WITHDRAWAL_COLUMNS
        );

        let updated = sqlx::query_as::<_, Withdrawal>(&sql)
            .bind(withdrawal_id)
            .bind(next)
            .bind(remark)
            .bind(now)
            .bind(completed_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        log::info!(
            "Withdrawal {} moved from {} to {}",
            withdrawal_id, current.status, next
        );

        Ok(updated)
    }

    /// 推广员的提现记录
    pub async fn list_for_promoter(
        &self,
        promoter_id: Uuid,
        query: &WithdrawalListQuery,
    ) -> AppResult<WithdrawalPage<WithdrawalResponse>> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM withdrawals WHERE promoter_id = $1")
            .bind(promoter_id)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            r#"
            SELECT {}
            FROM withdrawals
            WHERE promoter_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            WITHDRAWAL_COLUMNS
        );

        let withdrawals = sqlx::query_as::<_, Withdrawal>(&sql)
            .bind(promoter_id)
            .bind(query.limit() as i64)
            .bind(query.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(WithdrawalPage {
            withdrawals: withdrawals.iter().map(Withdrawal::to_response).collect(),
            pagination: PaginationInfo::new(query.page(), query.limit(), total as u64),
        })
    }

    /// 管理员查看提现申请, 可按状态过滤
    pub async fn list_all(
        &self,
        query: &WithdrawalListQuery,
    ) -> AppResult<WithdrawalPage<AdminWithdrawalView>> {
        let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => Some(
                value
                    .parse::<WithdrawalStatus>()
                    .map_err(|_| AppError::validation("无效的状态"))?,
            ),
            None => None,
        };

        let mut count_query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM withdrawals w WHERE 1=1");
        let mut list_query: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT w.id, w.promoter_id, a.username AS promoter_username, a.email AS promoter_email,
                   w.amount, w.payment_method, w.payment_code, w.status, w.remark,
                   w.created_at, w.processed_at, w.completed_at
            FROM withdrawals w
            JOIN accounts a ON a.id = w.promoter_id
            WHERE 1=1
            "#,
        );

        if let Some(status) = status {
            count_query.push(" AND w.status = ").push_bind(status);
            list_query.push(" AND w.status = ").push_bind(status);
        }

        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        list_query
            .push(" ORDER BY w.created_at DESC LIMIT ")
            .push_bind(query.limit() as i64)
            .push(" OFFSET ")
            .push_bind(query.offset() as i64);

        let withdrawals = list_query
            .build_query_as::<AdminWithdrawalView>()
            .fetch_all(&self.pool)
            .await?;

        Ok(WithdrawalPage {
            withdrawals,
            pagination: PaginationInfo::new(query.page(), query.limit(), total as u64),
        })
    }
}
