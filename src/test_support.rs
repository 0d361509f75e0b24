// 测试辅助
// 数据库用例标记为 ignore, 通过 TEST_DATABASE_URL 连接:
// TEST_DATABASE_URL=postgres://... cargo test -- --include-ignored

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::models::{Account, ActivationCode, MembershipType, RegisterRequest};
use crate::services::AccountService;
use crate::utils::generate_activation_code;

/// 连接测试数据库并执行迁移
pub async fn test_pool() -> Option<PgPool> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            log::warn!("TEST_DATABASE_URL not set, skipping database test");
            eprintln!("TEST_DATABASE_URL not set, skipping database test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

/// 注册一个随机账号, 可选绑定推广码
pub async fn create_account(pool: &PgPool, promoter_code: Option<&str>) -> Account {
    let suffix = &Uuid::new_v4().simple().to_string()[..12];
    let service = AccountService::new(pool.clone(), "test-pepper".to_string());
    let request = RegisterRequest {
        username: format!("u_{}", suffix),
        email: format!("{}@example.com", suffix),
        password: "secret123".to_string(),
        promotion_code: promoter_code.map(str::to_string),
    };
    let response = service.register(request).await.expect("Failed to register test account");
    service
        .get_account(response.account.id)
        .await
        .expect("Failed to load test account")
        .expect("Test account missing")
}

/// 直接插入一个激活码 (可构造已过期的码)
pub async fn insert_code(
    pool: &PgPool,
    membership_type: MembershipType,
    expires_at: DateTime<Utc>,
) -> ActivationCode {
    sqlx::query_as::<_, ActivationCode>(
        r#"
        INSERT INTO activation_codes (id, code, membership_type, expires_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, code, membership_type, is_activated, activated_at,
                  expires_at, usage_count, redeemed_by, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(format!("T{}", generate_activation_code()))
    .bind(membership_type)
    .bind(expires_at)
    .fetch_one(pool)
    .await
    .expect("Failed to insert activation code")
}
