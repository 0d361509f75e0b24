// 激活码兑换服务
// 在一个事务内完成: 锁定激活码、校验、创建会员、核销激活码、写审计日志、写分润事件
// 提交后尽力立即入账分润, 失败由后台任务重试

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use chrono::Utc;
use crate::error::{AppError, AppResult};
use crate::models::{ActivationAction, ActivationCode, Membership};
use crate::services::commission_service::CommissionService;
use crate::services::membership_service::{create_membership, find_active};
use crate::services::referral_service::find_relation;

pub(crate) const CODE_COLUMNS: &str = "id, code, membership_type, is_activated, activated_at, \
     expires_at, usage_count, redeemed_by, created_at";

/// 激活码兑换服务
pub struct ActivationService {
    pool: PgPool,
    commission_service: CommissionService,
}

impl ActivationService {
    pub fn new(pool: PgPool) -> Self {
        let commission_service = CommissionService::new(pool.clone());
        Self { pool, commission_service }
    }

    /// 兑换激活码
    ///
    /// # Arguments
    /// * `code` - 激活码
    /// * `account_id` - 兑换账号
    ///
    /// # Returns
    /// * 新建的会员记录
    pub async fn redeem(&self, code: &str, account_id: Uuid) -> AppResult<Membership> {
        let code = code.trim().to_uppercase();
        if code.is_empty() {
            return Err(AppError::validation("请输入激活码"));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // 行锁: 并发兑换同一激活码时只有一个能继续
        let sql = format!(
            "SELECT {} FROM activation_codes WHERE code = $1 FOR UPDATE",
            CODE_COLUMNS
        );
        let activation_code = sqlx::query_as::<_, ActivationCode>(&sql)
            .bind(&code)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::CodeNotFound)?;

        if activation_code.is_expired_at(now) {
            return Err(AppError::CodeExpired);
        }

        if activation_code.is_activated {
            return Err(AppError::CodeAlreadyUsed);
        }

        // 锁定账号, 串行化同一账号的并发兑换
        let account = sqlx::query_scalar::<_, Uuid>("SELECT id FROM accounts WHERE id = $1 FOR UPDATE")
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await?;
        if account.is_none() {
            return Err(AppError::unauthorized("账号不存在"));
        }

        let membership_type = activation_code.membership_type;
        if find_active(&mut *tx, account_id, Some(membership_type), now).await?.is_some() {
            return Err(AppError::DuplicateMembership);
        }

        let membership = create_membership(&mut tx, account_id, membership_type, now).await?;

        let flipped = sqlx::query(
            r#"
            UPDATE activation_codes
            SET is_activated = TRUE,
                activated_at = $2,
                redeemed_by = $3,
                usage_count = usage_count + 1
            WHERE id = $1 AND is_activated = FALSE
            "#,
        )
        .bind(activation_code.id)
        .bind(now)
        .bind(account_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if flipped == 0 {
            return Err(AppError::CodeAlreadyUsed);
        }

        write_activation_log(
            &mut tx,
            &activation_code.code,
            ActivationAction::Activated,
            &format!(
                "account {} activated {} membership {}",
                account_id, membership_type, membership.id
            ),
        )
        .await?;

        let has_promoter = find_relation(&mut *tx, account_id).await?.is_some();
        if has_promoter {
            sqlx::query(
                r#"
                INSERT INTO commission_events (
                    id, activation_code_id, account_id, membership_id, membership_type
                )
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(activation_code.id)
            .bind(account_id)
            .bind(membership.id)
            .bind(membership_type)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        log::info!(
            "Account {} redeemed code {} for {} membership {}",
            account_id, activation_code.code, membership_type, membership.id
        );

        if has_promoter {
            match self.commission_service.process_activation(activation_code.id).await {
                Ok(outcome) => log::debug!("Commission for code {}: {:?}", activation_code.code, outcome),
                Err(e) => log::error!(
                    "Failed to credit commission for code {}, will retry: {}",
                    activation_code.code, e
                ),
            }
        }

        Ok(membership)
    }
}

/// 写入激活码审计日志
pub(crate) async fn write_activation_log(
    conn: &mut PgConnection,
    code: &str,
    action: ActivationAction,
    details: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO activation_logs (id, code, action, details)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(code)
    .bind(action)
    .bind(details)
    .execute(conn)
    .await?;

    Ok(())
}
