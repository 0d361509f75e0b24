// 推广关系服务
// 负责注册时绑定推广员、查询被推广人的推广员、列出推广员名下的用户

use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;
use crate::error::AppResult;
use crate::models::{PromotedUser, PromotionRelation};

const RELATION_COLUMNS: &str = "id, promoter_id, referee_id, promotion_code_used, \
     total_purchase_amount, total_commission, created_at";

/// 推广关系服务
pub struct ReferralService {
    pool: PgPool,
}

impl ReferralService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 绑定推广关系 (独立事务)
    ///
    /// 推广码不存在、自己推广自己、已有推广员时均不绑定, 返回 None
    pub async fn link(&self, promotion_code: &str, referee_id: Uuid) -> AppResult<Option<PromotionRelation>> {
        let mut tx = self.pool.begin().await?;
        let relation = link_in_tx(&mut tx, promotion_code, referee_id).await?;
        tx.commit().await?;
        Ok(relation)
    }

    /// 查询被推广人的推广员
    pub async fn find_promoter(&self, referee_id: Uuid) -> AppResult<Option<Uuid>> {
        Ok(find_relation(&self.pool, referee_id)
            .await?
            .map(|relation| relation.promoter_id))
    }

    /// 推广员名下的用户列表
    pub async fn promoted_users(&self, promoter_id: Uuid) -> AppResult<Vec<PromotedUser>> {
        let users = sqlx::query_as::<_, PromotedUser>(
            r#"
            SELECT a.id, a.username, a.email, r.created_at AS joined_at,
                   r.total_purchase_amount, r.total_commission
            FROM promotion_relations r
            JOIN accounts a ON a.id = r.referee_id
            WHERE r.promoter_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(promoter_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}

/// 在调用方事务内绑定推广关系, 成功时推广员推广人数 +1
pub(crate) async fn link_in_tx(
    conn: &mut PgConnection,
    promotion_code: &str,
    referee_id: Uuid,
) -> Result<Option<PromotionRelation>, sqlx::Error> {
    let promotion_code = promotion_code.trim().to_uppercase();

    let promoter_id = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM accounts WHERE promotion_code = $1",
    )
    .bind(&promotion_code)
    .fetch_optional(&mut *conn)
    .await?;

    let promoter_id = match promoter_id {
        Some(id) if id != referee_id => id,
        Some(_) => {
            log::warn!("Account {} tried to use its own promotion code", referee_id);
            return Ok(None);
        }
        None => {
            log::info!("Promotion code {} not found, skipping referral link", promotion_code);
            return Ok(None);
        }
    };

    let sql = format!(
        r#"
        INSERT INTO promotion_relations (id, promoter_id, referee_id, promotion_code_used)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (referee_id) DO NOTHING
        RETURNING {}
        "#,
        RELATION_COLUMNS
    );

    let relation = sqlx::query_as::<_, PromotionRelation>(&sql)
        .bind(Uuid::new_v4())
        .bind(promoter_id)
        .bind(referee_id)
        .bind(&promotion_code)
        .fetch_optional(&mut *conn)
        .await?;

    if relation.is_some() {
        sqlx::query(
            r#"
            UPDATE accounts
            SET total_promotions = total_promotions + 1, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(promoter_id)
        .execute(&mut *conn)
        .await?;

        log::info!("Linked referee {} to promoter {}", referee_id, promoter_id);
    }

    Ok(relation)
}

/// 查询被推广人的推广关系
pub(crate) async fn find_relation<'e, E>(
    executor: E,
    referee_id: Uuid,
) -> Result<Option<PromotionRelation>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "SELECT {} FROM promotion_relations WHERE referee_id = $1",
        RELATION_COLUMNS
    );

    sqlx::query_as::<_, PromotionRelation>(&sql)
        .bind(referee_id)
        .fetch_optional(executor)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_account, test_pool};

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_registration_links_promoter_once() {
        let Some(pool) = test_pool().await else { return };
        let promoter = create_account(&pool, None).await;
        let referee = create_account(&pool, Some(&promoter.promotion_code)).await;
        let service = ReferralService::new(pool.clone());

        assert_eq!(service.find_promoter(referee.id).await.unwrap(), Some(promoter.id));

        // 第二次绑定不生效
        let other = create_account(&pool, None).await;
        assert!(service.link(&other.promotion_code, referee.id).await.unwrap().is_none());
        assert_eq!(service.find_promoter(referee.id).await.unwrap(), Some(promoter.id));

        let users = service.promoted_users(promoter.id).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, referee.id);

        let promotions: i32 = sqlx::query_scalar("SELECT total_promotions FROM accounts WHERE id = $1")
            .bind(promoter.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(promotions, 1);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_unknown_or_own_code_is_ignored() {
        let Some(pool) = test_pool().await else { return };
        let account = create_account(&pool, Some("REFNOPE00")).await;
        let service = ReferralService::new(pool.clone());

        assert!(service.find_promoter(account.id).await.unwrap().is_none());
        assert!(service.link(&account.promotion_code, account.id).await.unwrap().is_none());
        assert!(service.find_promoter(account.id).await.unwrap().is_none());
    }
}
