// 激活码生成服务
// 管理员批量生成激活码, 冲突时重新生成, 并写入审计日志

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use chrono::{Duration, Utc};
use crate::error::{AppError, AppResult};
use crate::models::{
    ActivationAction, ActivationCode, AdminCodeView, CodeListQuery, CodePage, MembershipType,
    PaginationInfo,
};
use crate::services::activation_service::{write_activation_log, CODE_COLUMNS};
use crate::utils::generate_activation_code;

/// 单次最多生成数量
pub const MAX_CODES_PER_BATCH: u32 = 100;
/// 默认有效天数
pub const DEFAULT_CODE_TTL_DAYS: i64 = 30;
/// 最长有效天数
pub const MAX_CODE_TTL_DAYS: i64 = 3650;
/// 单个激活码生成冲突重试次数
const MAX_GENERATION_ATTEMPTS: usize = 5;

/// 激活码生成服务
pub struct CodeService {
    pool: PgPool,
}

impl CodeService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 批量生成激活码
    ///
    /// # Arguments
    /// * `membership_type` - 会员等级 (字符串, 如 "premium")
    /// * `count` - 生成数量, 默认1
    /// * `expires_in_days` - 有效天数, 默认30
    pub async fn generate(
        &self,
        membership_type: Option<&str>,
        count: Option<u32>,
        expires_in_days: Option<i64>,
    ) -> AppResult<Vec<ActivationCode>> {
        let membership_type: MembershipType = membership_type
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::validation("请选择会员类型"))?
            .parse()
            .map_err(|_| AppError::validation("无效的会员类型"))?;

        let count = count.unwrap_or(1);
        if count == 0 || count > MAX_CODES_PER_BATCH {
            return Err(AppError::validation(format!(
                "生成数量必须在1-{}之间",
                MAX_CODES_PER_BATCH
            )));
        }

        let ttl_days = expires_in_days.unwrap_or(DEFAULT_CODE_TTL_DAYS);
        if !(1..=MAX_CODE_TTL_DAYS).contains(&ttl_days) {
            return Err(AppError::validation(format!(
                "有效天数必须在1-{}之间",
                MAX_CODE_TTL_DAYS
            )));
        }

        let expires_at = Utc::now() + Duration::days(ttl_days);
        let mut tx = self.pool.begin().await?;
        let mut codes = Vec::with_capacity(count as usize);

        let sql = format!(
            r#"
            INSERT INTO activation_codes (id, code, membership_type, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (code) DO NOTHING
            RETURNING {}
            "#,
            CODE_COLUMNS
        );

        for _ in 0..count {
            let mut inserted = None;

            for _ in 0..MAX_GENERATION_ATTEMPTS {
                inserted = sqlx::query_as::<_, ActivationCode>(&sql)
                    .bind(Uuid::new_v4())
                    .bind(generate_activation_code())
                    .bind(membership_type)
                    .bind(expires_at)
                    .fetch_optional(&mut *tx)
                    .await?;

                if inserted.is_some() {
                    break;
                }
                log::warn!("Activation code collision, regenerating");
            }

            let code = inserted.ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("Failed to generate a unique activation code"))
            })?;

            write_activation_log(
                &mut tx,
                &code.code,
                ActivationAction::Generated,
                &format!("generated {} code, expires at {}", membership_type, expires_at),
            )
            .await?;

            codes.push(code);
        }

        tx.commit().await?;

        log::info!(
            "Generated {} {} activation codes (expires at {})",
            codes.len(), membership_type, expires_at
        );

        Ok(codes)
    }

    /// 激活码分页列表, 可按等级和激活状态过滤
    ///
    /// 每个激活码附带最近一条审计日志
    pub async fn list(&self, query: &CodeListQuery) -> AppResult<CodePage> {
        let membership_type = match query.membership_type.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => Some(
                value
                    .parse::<MembershipType>()
                    .map_err(|_| AppError::validation("无效的会员类型"))?,
            ),
            None => None,
        };

        let is_activated = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some("activated") => Some(true),
            Some("unactivated") => Some(false),
            Some(_) => return Err(AppError::validation("无效的状态")),
            None => None,
        };

        let mut count_query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM activation_codes c WHERE 1=1");
        let mut list_query: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT c.id, c.code, c.membership_type, c.is_activated, c.activated_at,
                   c.expires_at, c.usage_count, c.redeemed_by, c.created_at,
                   l.action AS latest_log_action, l.details AS latest_log_details,
                   l.created_at AS latest_log_at
            FROM activation_codes c
            LEFT JOIN LATERAL (
                SELECT action, details, created_at
                FROM activation_logs
                WHERE code = c.code
                ORDER BY created_at DESC
                LIMIT 1
            ) l ON TRUE
            WHERE 1=1
            "#,
        );

        if let Some(membership_type) = membership_type {
            count_query.push(" AND c.membership_type = ").push_bind(membership_type);
            list_query.push(" AND c.membership_type = ").push_bind(membership_type);
        }

        if let Some(is_activated) = is_activated {
            count_query.push(" AND c.is_activated = ").push_bind(is_activated);
            list_query.push(" AND c.is_activated = ").push_bind(is_activated);
        }

        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        list_query
            .push(" ORDER BY c.created_at DESC LIMIT ")
            .push_bind(query.limit() as i64)
            .push(" OFFSET ")
            .push_bind(query.offset() as i64);

        let codes = list_query
            .build_query_as::<AdminCodeView>()
            .fetch_all(&self.pool)
            .await?;

        Ok(CodePage {
            codes,
            pagination: PaginationInfo::new(query.page(), query.limit(), total as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ActivationService;
    use crate::test_support::{create_account, test_pool};

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_generate_codes() {
        let Some(pool) = test_pool().await else { return };
        let service = CodeService::new(pool.clone());

        let codes = service.generate(Some("premium"), Some(3), Some(7)).await.unwrap();
        assert_eq!(codes.len(), 3);
        for code in &codes {
            assert_eq!(code.code.len(), 12);
            assert_eq!(code.membership_type, MembershipType::Premium);
            assert!(!code.is_activated);
            assert!(code.expires_at > Utc::now() + Duration::days(6));
        }

        let logs: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM activation_logs WHERE code = $1 AND action = 'generated'",
        )
        .bind(&codes[0].code)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(logs, 1);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_generate_defaults_to_one_code() {
        let Some(pool) = test_pool().await else { return };
        let codes = CodeService::new(pool).generate(Some("temporary"), None, None).await.unwrap();
        assert_eq!(codes.len(), 1);
        assert!(codes[0].expires_at > Utc::now() + Duration::days(29));
    }

    #[tokio::test]
    async fn test_generate_rejects_bad_input() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let service = CodeService::new(pool);

        assert!(matches!(service.generate(None, Some(1), None).await, Err(AppError::Validation(_))));
        assert!(matches!(service.generate(Some("gold"), Some(1), None).await, Err(AppError::Validation(_))));
        assert!(matches!(service.generate(Some("regular"), Some(0), None).await, Err(AppError::Validation(_))));
        assert!(matches!(service.generate(Some("regular"), Some(101), None).await, Err(AppError::Validation(_))));
        assert!(matches!(service.generate(Some("regular"), Some(1), Some(0)).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_list_filters_by_status_with_latest_log() {
        let Some(pool) = test_pool().await else { return };
        let service = CodeService::new(pool.clone());
        let codes = service.generate(Some("premium"), Some(2), None).await.unwrap();
        let account = create_account(&pool, None).await;
        ActivationService::new(pool.clone()).redeem(&codes[0].code, account.id).await.unwrap();

        let activated = service
            .list(&CodeListQuery {
                limit: Some(100),
                membership_type: Some("premium".to_string()),
                status: Some("activated".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(activated.codes.iter().all(|c| c.is_activated && c.membership_type == MembershipType::Premium));
        assert!(activated.codes.iter().all(|c| c.id != codes[1].id));
        let redeemed = activated.codes.iter().find(|c| c.id == codes[0].id).unwrap();
        assert_eq!(redeemed.redeemed_by, Some(account.id));
        assert_eq!(redeemed.latest_log_action, Some(ActivationAction::Activated));
        assert!(activated.pagination.total >= 1);

        let unactivated = service
            .list(&CodeListQuery {
                limit: Some(100),
                membership_type: Some("premium".to_string()),
                status: Some("unactivated".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let fresh = unactivated.codes.iter().find(|c| c.id == codes[1].id).unwrap();
        assert!(!fresh.is_activated);
        assert_eq!(fresh.latest_log_action, Some(ActivationAction::Generated));
        assert_eq!(unactivated.pagination.limit, 100);
    }

    #[tokio::test]
    async fn test_list_rejects_bad_filters() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let service = CodeService::new(pool);

        let bad_status = CodeListQuery {
            status: Some("used".to_string()),
            ..Default::default()
        };
        assert!(matches!(service.list(&bad_status).await, Err(AppError::Validation(_))));

        let bad_type = CodeListQuery {
            membership_type: Some("gold".to_string()),
            ..Default::default()
        };
        assert!(matches!(service.list(&bad_type).await, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_list_query_paging_defaults() {
        let query = CodeListQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), 20);
        assert_eq!(query.offset(), 0);

        let query = CodeListQuery { page: Some(3), limit: Some(500), ..Default::default() };
        assert_eq!(query.limit(), 100);
        assert_eq!(query.offset(), 200);
    }
}
