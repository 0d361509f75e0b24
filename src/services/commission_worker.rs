// 分润后台任务
// 定时处理未完成的分润事件, 并顺带把已到期的会员标记为过期

use sqlx::PgPool;
use tokio::time::{sleep, Duration};
use crate::config::OutboxConfig;
use crate::error::AppResult;
use crate::services::{CommissionService, MembershipService};

/// 单次周期的处理结果
#[derive(Debug, Default, PartialEq)]
pub struct CycleReport {
    pub commissions_processed: usize,
    pub memberships_expired: u64,
}

/// 分润后台任务
pub struct CommissionWorker {
    commission_service: CommissionService,
    membership_service: MembershipService,
    config: OutboxConfig,
}

impl CommissionWorker {
    pub fn new(pool: PgPool, config: OutboxConfig) -> Self {
        Self {
            commission_service: CommissionService::new(pool.clone()),
            membership_service: MembershipService::new(pool),
            config,
        }
    }

    /// 启动后台循环, 单个周期失败只记录日志
    pub async fn start(self) {
        log::info!(
            "Starting commission worker (interval: {}s, batch: {}, max attempts: {})",
            self.config.poll_interval, self.config.batch_size, self.config.max_attempts
        );

        let interval = Duration::from_secs(self.config.poll_interval.max(1));

        loop {
            if let Err(e) = self.run_cycle().await {
                log::error!("Commission worker cycle failed: {}", e);
            }

            sleep(interval).await;
        }
    }

    /// 执行一次处理周期
    pub async fn run_cycle(&self) -> AppResult<CycleReport> {
        let commissions_processed = self
            .commission_service
            .process_pending(self.config.batch_size, self.config.max_attempts)
            .await?;

        if commissions_processed > 0 {
            log::info!("Processed {} pending commission events", commissions_processed);
        } else {
            log::debug!("No pending commission events in this cycle");
        }

        let memberships_expired = if self.config.sweep_expired_memberships {
            self.membership_service.mark_expired_memberships().await?
        } else {
            0
        };

        Ok(CycleReport {
            commissions_processed,
            memberships_expired,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use uuid::Uuid;
    use crate::models::MembershipType;
    use crate::services::ActivationService;
    use crate::test_support::{create_account, insert_code, test_pool};

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_cycle_retries_unprocessed_event() {
        let Some(pool) = test_pool().await else { return };
        let promoter = create_account(&pool, None).await;
        let referee = create_account(&pool, Some(&promoter.promotion_code)).await;
        let code = insert_code(&pool, MembershipType::Regular, Utc::now() + ChronoDuration::days(1)).await;
        ActivationService::new(pool.clone()).redeem(&code.code, referee.id).await.unwrap();

        // 模拟提交后立即入账失败: 回退入账结果, 事件重新变为待处理
        sqlx::query("DELETE FROM commission_records WHERE activation_code_id = $1")
            .bind(code.id)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE accounts SET total_earnings = 0, available_balance = 0 WHERE id = $1")
            .bind(promoter.id)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE commission_events SET processed_at = NULL WHERE activation_code_id = $1")
            .bind(code.id)
            .execute(&pool)
            .await
            .unwrap();

        let worker = CommissionWorker::new(
            pool.clone(),
            OutboxConfig {
                poll_interval: 1,
                batch_size: 1000,
                max_attempts: 5,
                sweep_expired_memberships: true,
            },
        );
        let report = worker.run_cycle().await.unwrap();
        assert!(report.commissions_processed >= 1);

        let balance: Decimal = sqlx::query_scalar("SELECT available_balance FROM accounts WHERE id = $1")
            .bind(promoter.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(balance, Decimal::from_str("19.90").unwrap());

        let processed: bool = sqlx::query_scalar(
            "SELECT processed_at IS NOT NULL FROM commission_events WHERE activation_code_id = $1",
        )
        .bind(code.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(processed);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_event_without_promoter_is_skipped() {
        let Some(pool) = test_pool().await else { return };
        let promoter = create_account(&pool, None).await;
        let referee = create_account(&pool, Some(&promoter.promotion_code)).await;
        let code = insert_code(&pool, MembershipType::Temporary, Utc::now() + ChronoDuration::days(1)).await;
        let membership_id: Uuid = {
            let mut conn = pool.acquire().await.unwrap();
            crate::services::membership_service::create_membership(
                &mut conn, referee.id, MembershipType::Temporary, Utc::now(),
            )
            .await
            .unwrap()
            .id
        };

        // 推广关系在事件处理前被移除
        sqlx::query("DELETE FROM promotion_relations WHERE referee_id = $1")
            .bind(referee.id)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            r#"
            INSERT INTO commission_events (id, activation_code_id, account_id, membership_id, membership_type)
            VALUES ($1, $2, $3, $4, 'temporary')
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(code.id)
        .bind(referee.id)
        .bind(membership_id)
        .execute(&pool)
        .await
        .unwrap();

        let outcome = CommissionService::new(pool.clone())
            .process_activation(code.id)
            .await
            .unwrap();
        assert_eq!(outcome, Some(crate::models::CommissionOutcome::Skipped));

        let (processed, attempts): (bool, i32) = sqlx::query_as(
            "SELECT processed_at IS NOT NULL, attempts FROM commission_events WHERE activation_code_id = $1",
        )
        .bind(code.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(processed);
        assert_eq!(attempts, 1);

        let earnings: Decimal = sqlx::query_scalar("SELECT total_earnings FROM accounts WHERE id = $1")
            .bind(promoter.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(earnings, Decimal::ZERO);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_failed_event_is_retried_in_next_cycle() {
        let Some(pool) = test_pool().await else { return };
        let promoter = create_account(&pool, None).await;
        let referee = create_account(&pool, Some(&promoter.promotion_code)).await;
        let code = insert_code(&pool, MembershipType::Regular, Utc::now() + ChronoDuration::days(1)).await;

        // 仅针对该被推广人的分润写入报错, 模拟一次临时故障
        let suffix = Uuid::new_v4().simple().to_string();
        let function = format!("fail_commission_{}", suffix);
        let trigger = format!("fail_commission_trigger_{}", suffix);
        sqlx::query(&format!(
            r#"
            CREATE FUNCTION {function}() RETURNS trigger AS $$
            BEGIN
                IF NEW.referee_id = '{referee}'::uuid THEN
                    RAISE EXCEPTION 'commission store unavailable';
                END IF;
                RETURN NEW;
            END;
            $$ LANGUAGE plpgsql
            "#,
            function = function,
            referee = referee.id
        ))
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(&format!(
            "CREATE TRIGGER {} BEFORE INSERT ON commission_records FOR EACH ROW EXECUTE FUNCTION {}()",
            trigger, function
        ))
        .execute(&pool)
        .await
        .unwrap();

        // 激活本身不受分润失败影响
        ActivationService::new(pool.clone()).redeem(&code.code, referee.id).await.unwrap();

        let worker = CommissionWorker::new(
            pool.clone(),
            OutboxConfig {
                poll_interval: 1,
                batch_size: 1000,
                max_attempts: 5,
                sweep_expired_memberships: false,
            },
        );
        worker.run_cycle().await.unwrap();

        let (processed, attempts): (bool, i32) = sqlx::query_as(
            "SELECT processed_at IS NOT NULL, attempts FROM commission_events WHERE activation_code_id = $1",
        )
        .bind(code.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(!processed);
        assert!(attempts >= 2 && attempts < 5, "attempts = {}", attempts);

        // 故障恢复
        sqlx::query(&format!("DROP TRIGGER {} ON commission_records", trigger))
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(&format!("DROP FUNCTION {}()", function))
            .execute(&pool)
            .await
            .unwrap();

        worker.run_cycle().await.unwrap();

        let processed: bool = sqlx::query_scalar(
            "SELECT processed_at IS NOT NULL FROM commission_events WHERE activation_code_id = $1",
        )
        .bind(code.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(processed);

        let balance: Decimal = sqlx::query_scalar("SELECT available_balance FROM accounts WHERE id = $1")
            .bind(promoter.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(balance, Decimal::from_str("19.90").unwrap());
    }
}
