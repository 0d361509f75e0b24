// 分润服务
// 负责分润比例计算、分润入账, 以及消费激活事务写入的分润事件

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use chrono::Utc;
use rust_decimal::Decimal;
use crate::error::{AppError, AppResult};
use crate::models::{
    CommissionEvent, CommissionOutcome, CommissionRecord, CommissionRequest, CommissionStatus, MembershipType,
};
use crate::services::membership_service::find_active;

const EVENT_COLUMNS: &str = "id, activation_code_id, account_id, membership_id, membership_type, \
     attempts, last_error, processed_at, created_at";

/// 推广员等级对应的分润比例
///
/// 无会员/临时/普通 5%, 高级 10%, 超级 30%
pub fn commission_rate(promoter_tier: Option<MembershipType>) -> Decimal {
    match promoter_tier {
        None | Some(MembershipType::Temporary) | Some(MembershipType::Regular) => Decimal::new(5, 2),
        Some(MembershipType::Premium) => Decimal::new(10, 2),
        Some(MembershipType::Super) => Decimal::new(30, 2),
    }
}

/// 计算分润金额 (保留两位小数)
pub fn calculate_commission(membership_type: MembershipType, promoter_tier: Option<MembershipType>) -> Decimal {
    (membership_type.price() * commission_rate(promoter_tier)).round_dp(2)
}

enum ClaimResult {
    Empty,
    Done(CommissionOutcome),
    Failed { event_id: Uuid, error: String },
}

/// 分润服务
#[derive(Clone)]
pub struct CommissionService {
    pool: PgPool,
}

impl CommissionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 为推广员入账一笔分润 (独立事务)
    pub async fn credit(&self, request: CommissionRequest) -> AppResult<CommissionOutcome> {
        let mut tx = self.pool.begin().await?;
        let outcome = credit_in_tx(&mut tx, &request).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// 立即处理某个激活码对应的分润事件
    ///
    /// 激活提交后调用; 失败只记录在事件上, 由后台任务重试
    pub async fn process_activation(&self, activation_code_id: Uuid) -> AppResult<Option<CommissionOutcome>> {
        match self.process_next(Some(activation_code_id), i32::MAX, &[]).await? {
            ClaimResult::Empty => Ok(None),
            ClaimResult::Done(outcome) => Ok(Some(outcome)),
            ClaimResult::Failed { error, .. } => Err(anyhow::anyhow!(error).into()),
        }
    }

    /// 批量处理待处理的分润事件
    ///
    /// 同一批次内每个事件最多尝试一次, 失败的事件留到下一个周期重试
    ///
    /// # Returns
    /// * 本批处理成功的事件数量
    pub async fn process_pending(&self, batch_size: i64, max_attempts: i32) -> AppResult<usize> {
        let mut processed = 0;
        let mut failed: Vec<Uuid> = Vec::new();

        for _ in 0..batch_size.max(0) {
            match self.process_next(None, max_attempts, &failed).await? {
                ClaimResult::Empty => break,
                ClaimResult::Done(_) => processed += 1,
                ClaimResult::Failed { event_id, .. } => failed.push(event_id),
            }
        }

        if !failed.is_empty() {
            log::warn!("{} commission events failed in this batch, will retry next cycle", failed.len());
        }

        Ok(processed)
    }

    /// 认领并处理一条事件, 入账失败时回滚并记录错误
    async fn process_next(
        &self,
        activation_code_id: Option<Uuid>,
        max_attempts: i32,
        exclude: &[Uuid],
    ) -> AppResult<ClaimResult> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            SELECT {}
            FROM commission_events
            WHERE processed_at IS NULL
              AND attempts < $1
              AND ($2::uuid IS NULL OR activation_code_id = $2)
              AND NOT (id = ANY($3::uuid[]))
            ORDER BY created_at
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
            EVENT_COLUMNS
        );

        let event = sqlx::query_as::<_, CommissionEvent>(&sql)
            .bind(max_attempts)
            .bind(activation_code_id)
            .bind(exclude.to_vec())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(event) = event else {
            return Ok(ClaimResult::Empty);
        };

        match self.apply_event(&mut tx, &event).await {
            Ok(outcome) => {
                sqlx::query(
                    r#"
                    UPDATE commission_events
                    SET processed_at = NOW(), attempts = attempts + 1, last_error = NULL
                    WHERE id = $1
                    "#,
                )
                .bind(event.id)
                .execute(&mut *tx)
                .await?;

                tx.commit().await?;
                Ok(ClaimResult::Done(outcome))
            }
            Err(e) => {
                tx.rollback().await?;
                let error = e.to_string();
                log::error!(
                    "Commission event {} failed (attempt {}): {}",
                    event.id, event.attempts + 1, error
                );
                self.record_failure(event.id, &error).await?;
                Ok(ClaimResult::Failed { event_id: event.id, error })
            }
        }
    }

    async fn apply_event(
        &self,
        conn: &mut PgConnection,
        event: &CommissionEvent,
    ) -> AppResult<CommissionOutcome> {
        let promoter_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT promoter_id FROM promotion_relations WHERE referee_id = $1",
        )
        .bind(event.account_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(promoter_id) = promoter_id else {
            log::warn!("Commission event {} has no promoter, skipping", event.id);
            return Ok(CommissionOutcome::Skipped);
        };

        let request = CommissionRequest {
            promoter_id,
            referee_id: event.account_id,
            membership_type: event.membership_type,
            membership_id: Some(event.membership_id),
            activation_code_id: Some(event.activation_code_id),
        };

        credit_in_tx(conn, &request).await
    }

    async fn record_failure(&self, event_id: Uuid, error: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE commission_events
            SET attempts = attempts + 1, last_error = $2
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// 在调用方事务内入账分润
///
/// 以激活码ID幂等: 同一激活码只会产生一条分润记录
pub(crate) async fn credit_in_tx(
    conn: &mut PgConnection,
    request: &CommissionRequest,
) -> AppResult<CommissionOutcome> {
    // 锁定推广员账号, 串行化同一推广员的余额变更
    let promoter = sqlx::query_scalar::<_, Uuid>("SELECT id FROM accounts WHERE id = $1 FOR UPDATE")
        .bind(request.promoter_id)
        .fetch_optional(&mut *conn)
        .await?;
    if promoter.is_none() {
        return Err(AppError::not_found("推广员不存在"));
    }

    if let Some(activation_code_id) = request.activation_code_id {
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM commission_records WHERE activation_code_id = $1",
        )
        .bind(activation_code_id)
        .fetch_one(&mut *conn)
        .await?;

        if existing > 0 {
            return Ok(CommissionOutcome::AlreadyCredited);
        }
    }

    let now = Utc::now();
    let promoter_tier = find_active(&mut *conn, request.promoter_id, None, now)
        .await?
        .map(|membership| membership.membership_type);

    let rate = commission_rate(promoter_tier);
    let price = request.membership_type.price();
    let amount = calculate_commission(request.membership_type, promoter_tier);

    if amount <= Decimal::ZERO {
        log::debug!("Commission for promoter {} is zero, skipping", request.promoter_id);
        return Ok(CommissionOutcome::Skipped);
    }

    let record = sqlx::query_as::<_, CommissionRecord>(
        r#"
        INSERT INTO commission_records (
            id, promoter_id, referee_id, membership_id, activation_code_id,
            amount, rate, membership_type, membership_price, status, confirmed_at, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
        ON CONFLICT (activation_code_id) DO NOTHING
        RETURNING id, promoter_id, referee_id, membership_id, activation_code_id,
                  amount, rate, membership_type, membership_price, status, confirmed_at, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(request.promoter_id)
    .bind(request.referee_id)
    .bind(request.membership_id)
    .bind(request.activation_code_id)
    .bind(amount)
    .bind(rate)
    .bind(request.membership_type)
    .bind(price)
    .bind(CommissionStatus::Confirmed)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(record) = record else {
        return Ok(CommissionOutcome::AlreadyCredited);
    };

    sqlx::query(
        r#"
        UPDATE accounts
        SET total_earnings = total_earnings + $1,
            available_balance = available_balance + $1,
            updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(amount)
    .bind(request.promoter_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        UPDATE promotion_relations
        SET total_purchase_amount = total_purchase_amount + $1,
            total_commission = total_commission + $2
        WHERE promoter_id = $3 AND referee_id = $4
        "#,
    )
    .bind(price)
    .bind(amount)
    .bind(request.promoter_id)
    .bind(request.referee_id)
    .execute(&mut *conn)
    .await?;

    log::info!(
        "Credited commission {} to promoter {} (referee: {}, type: {}, rate: {})",
        amount, request.promoter_id, request.referee_id, request.membership_type, rate
    );

    Ok(CommissionOutcome::Credited { record_id: record.id, amount: record.amount })
}
