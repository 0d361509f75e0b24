// 会员账本服务
// 负责查询当前有效会员、创建会员记录、扣减下载额度、标记过期会员

use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use crate::error::{AppError, AppResult};
use crate::models::{Membership, MembershipStatus, MembershipType};

pub(crate) const MEMBERSHIP_COLUMNS: &str = "id, owner_id, membership_type, start_time, end_time, \
     remaining_downloads, status, created_at, updated_at";

/// 会员账本服务
pub struct MembershipService {
    pool: PgPool,
}

impl MembershipService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 获取账号当前有效的会员 (按创建时间取最新一条)
    pub async fn get_active(&self, owner_id: Uuid) -> AppResult<Option<Membership>> {
        Ok(find_active(&self.pool, owner_id, None, Utc::now()).await?)
    }

    /// 扣减一次下载额度
    ///
    /// 无限额度 (-1) 不扣减; 额度不足返回 QuotaExhausted
    pub async fn consume_download(&self, membership_id: Uuid) -> AppResult<Membership> {
        let sql = format!(
            r#"
            UPDATE memberships
            SET remaining_downloads = CASE
                    WHEN remaining_downloads = -1 THEN -1
                    ELSE remaining_downloads - 1
                END,
                updated_at = NOW()
            WHERE id = $1 AND (remaining_downloads = -1 OR remaining_downloads > 0)
            RETURNING {}
            "#,
            MEMBERSHIP_COLUMNS
        );

        let updated = sqlx::query_as::<_, Membership>(&sql)
            .bind(membership_id)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(membership) => {
                log::info!(
                    "Consumed download from membership {} (remaining: {})",
                    membership.id, membership.remaining_downloads
                );
                Ok(membership)
            }
            None => {
                let exists = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM memberships WHERE id = $1",
                )
                .bind(membership_id)
                .fetch_one(&self.pool)
                .await?;

                if exists == 0 {
                    Err(AppError::not_found("会员记录不存在"))
                } else {
                    Err(AppError::QuotaExhausted)
                }
            }
        }
    }

    /// 为账号当前有效会员扣减一次下载额度
    pub async fn consume_download_for_owner(&self, owner_id: Uuid) -> AppResult<Membership> {
        let membership = self
            .get_active(owner_id)
            .await?
            .ok_or(AppError::NoActiveMembership)?;

        self.consume_download(membership.id).await
    }

    /// 标记已过期的会员
    ///
    /// # Returns
    /// * 标记的会员数量
    pub async fn mark_expired_memberships(&self) -> AppResult<u64> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE memberships
            SET status = 'expired', updated_at = NOW()
            WHERE status = 'active' AND end_time <= NOW()
            "#,
        )
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected > 0 {
            log::info!("Marked {} memberships as expired", rows_affected);
        }

        Ok(rows_affected)
    }
}

/// 查询有效会员, 可限定会员等级
pub(crate) async fn find_active<'e, E>(
    executor: E,
    owner_id: Uuid,
    membership_type: Option<MembershipType>,
    now: DateTime<Utc>,
) -> Result<Option<Membership>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        r#"
        SELECT {}
        FROM memberships
        WHERE owner_id = $1
          AND status = 'active'
          AND end_time > $2
          AND ($3::varchar IS NULL OR membership_type = $3)
        ORDER BY created_at DESC
        LIMIT 1
        "#,
        MEMBERSHIP_COLUMNS
    );

    sqlx::query_as::<_, Membership>(&sql)
        .bind(owner_id)
        .bind(now)
        .bind(membership_type.map(|t| t.as_str()))
        .fetch_optional(executor)
        .await
}

/// 在事务内创建会员记录
pub(crate) async fn create_membership(
    conn: &mut PgConnection,
    owner_id: Uuid,
    membership_type: MembershipType,
    start_time: DateTime<Utc>,
) -> Result<Membership, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO memberships (
            id, owner_id, membership_type, start_time, end_time,
            remaining_downloads, status, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $4, $4)
        RETURNING {}
        "#,
        MEMBERSHIP_COLUMNS
    );

    sqlx::query_as::<_, Membership>(&sql)
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(membership_type)
        .bind(start_time)
        .bind(membership_type.end_time_from(start_time))
        .bind(membership_type.download_quota())
        .bind(MembershipStatus::Active)
        .fetch_one(conn)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::test_support::{create_account, test_pool};

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_get_active_returns_latest() {
        let Some(pool) = test_pool().await else { return };
        let account = create_account(&pool, None).await;
        let service = MembershipService::new(pool.clone());

        assert!(service.get_active(account.id).await.unwrap().is_none());

        let mut conn = pool.acquire().await.unwrap();
        let now = Utc::now();
        create_membership(&mut conn, account.id, MembershipType::Regular, now - Duration::seconds(5))
            .await
            .unwrap();
        let latest = create_membership(&mut conn, account.id, MembershipType::Premium, now)
            .await
            .unwrap();

        let active = service.get_active(account.id).await.unwrap().unwrap();
        assert_eq!(active.id, latest.id);
        assert_eq!(active.remaining_downloads, -1);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_consume_download_until_exhausted() {
        let Some(pool) = test_pool().await else { return };
        let account = create_account(&pool, None).await;
        let service = MembershipService::new(pool.clone());

        let mut conn = pool.acquire().await.unwrap();
        let membership = create_membership(&mut conn, account.id, MembershipType::Temporary, Utc::now())
            .await
            .unwrap();
        assert_eq!(membership.remaining_downloads, 1);

        let after = service.consume_download(membership.id).await.unwrap();
        assert_eq!(after.remaining_downloads, 0);

        let err = service.consume_download(membership.id).await.unwrap_err();
        assert!(matches!(err, AppError::QuotaExhausted));

        let err = service.consume_download(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_unlimited_quota_is_not_decremented() {
        let Some(pool) = test_pool().await else { return };
        let account = create_account(&pool, None).await;
        let service = MembershipService::new(pool.clone());

        let mut conn = pool.acquire().await.unwrap();
        create_membership(&mut conn, account.id, MembershipType::Super, Utc::now())
            .await
            .unwrap();

        for _ in 0..3 {
            let membership = service.consume_download_for_owner(account.id).await.unwrap();
            assert_eq!(membership.remaining_downloads, -1);
        }
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_expired_membership_is_not_active() {
        let Some(pool) = test_pool().await else { return };
        let account = create_account(&pool, None).await;
        let service = MembershipService::new(pool.clone());

        let mut conn = pool.acquire().await.unwrap();
        create_membership(&mut conn, account.id, MembershipType::Temporary, Utc::now() - Duration::days(2))
            .await
            .unwrap();

        assert!(service.get_active(account.id).await.unwrap().is_none());
        assert!(matches!(
            service.consume_download_for_owner(account.id).await.unwrap_err(),
            AppError::NoActiveMembership
        ));

        assert!(service.mark_expired_memberships().await.unwrap() >= 1);
        let status: MembershipStatus = sqlx::query_scalar(
            "SELECT status FROM memberships WHERE owner_id = $1",
        )
        .bind(account.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(status, MembershipStatus::Expired);
    }
}
