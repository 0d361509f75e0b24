// 账号服务
// 负责注册 (含推广关系绑定)、登录会话、会话解析与管理员余额清零

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;
use chrono::{Duration, Utc};
use crate::error::{AppError, AppResult};
use crate::models::{
    Account, LoginOutcome, LoginRequest, RegisterRequest, RegisterResponse, RegisteredAccount,
};
use crate::services::referral_service::link_in_tx;
use crate::utils::{
    generate_promotion_code, generate_session_token, hash_password, hash_token, verify_password,
    InputValidator,
};

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, promotion_code, total_earnings, \
     available_balance, total_promotions, created_at, updated_at";

/// 推广码生成重试次数
const MAX_PROMOTION_CODE_ATTEMPTS: usize = 10;

/// 默认会话有效天数
const DEFAULT_SESSION_TTL_DAYS: i64 = 30;

/// 账号服务
pub struct AccountService {
    pool: PgPool,
    password_pepper: String,
    session_ttl_days: i64,
}

impl AccountService {
    pub fn new(pool: PgPool, password_pepper: String) -> Self {
        Self {
            pool,
            password_pepper,
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
        }
    }

    /// 设置会话有效天数
    pub fn with_session_ttl(mut self, days: i64) -> Self {
        self.session_ttl_days = days.max(1);
        self
    }

    /// 注册账号
    ///
    /// 推广码有效时在同一事务内绑定推广关系; 推广码无效时忽略
    pub async fn register(&self, request: RegisterRequest) -> AppResult<RegisterResponse> {
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_lowercase();

        let mut validator = InputValidator::new();
        validator.validate_username_field("username", &username);
        validator.validate_email_field("email", &email);
        validator.validate_password_field("password", &request.password);
        validator.into_result()?;

        let mut tx = self.pool.begin().await?;

        let username_taken = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts WHERE username = $1")
            .bind(&username)
            .fetch_one(&mut *tx)
            .await?;
        if username_taken > 0 {
            return Err(AppError::conflict("用户名已存在"));
        }

        let email_taken = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts WHERE email = $1")
            .bind(&email)
            .fetch_one(&mut *tx)
            .await?;
        if email_taken > 0 {
            return Err(AppError::conflict("邮箱已被注册"));
        }

        let mut promotion_code = None;
        for _ in 0..MAX_PROMOTION_CODE_ATTEMPTS {
            let candidate = generate_promotion_code();
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM accounts WHERE promotion_code = $1",
            )
            .bind(&candidate)
            .fetch_one(&mut *tx)
            .await?;

            if exists == 0 {
                promotion_code = Some(candidate);
                break;
            }
        }
        let promotion_code = promotion_code.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("Failed to generate a unique promotion code"))
        })?;

        let password_hash = hash_password(&request.password, &self.password_pepper)?;
        let account_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO accounts (id, username, email, password_hash, promotion_code)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(account_id)
        .bind(&username)
        .bind(&email)
        .bind(&password_hash)
        .bind(&promotion_code)
        .execute(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        let referred = match request
            .promotion_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
        {
            Some(code) => link_in_tx(&mut tx, code, account_id).await?.is_some(),
            None => false,
        };

        tx.commit().await?;

        log::info!(
            "Registered account {} ({}), referred: {}",
            account_id, username, referred
        );

        Ok(RegisterResponse {
            success: true,
            message: "注册成功".to_string(),
            account: RegisteredAccount {
                id: account_id,
                username,
                email,
                promotion_code,
                referred,
            },
        })
    }

    /// 登录并创建会话
    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginOutcome> {
        let username = request.username.trim();
        if username.is_empty() || request.password.is_empty() {
            return Err(AppError::validation("请输入用户名和密码"));
        }

        let sql = format!("SELECT {} FROM accounts WHERE username = $1", ACCOUNT_COLUMNS);
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        let account = match account {
            Some(account) if verify_password(&request.password, &account.password_hash, &self.password_pepper)? => account,
            _ => {
                log::warn!("Failed login attempt for username {}", username);
                return Err(AppError::unauthorized("用户名或密码错误"));
            }
        };

        let token = generate_session_token();
        let expires_at = Utc::now() + Duration::days(self.session_ttl_days);

        sqlx::query(
            r#"
            INSERT INTO sessions (id, account_id, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(account.id)
        .bind(hash_token(&token))
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        log::info!("Account {} logged in", account.id);

        Ok(LoginOutcome { account, token, expires_at })
    }

    /// 根据会话令牌解析账号ID, 过期或不存在返回 None
    pub async fn resolve_session(&self, token: &str) -> AppResult<Option<Uuid>> {
        let account_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT account_id
            FROM sessions
            WHERE token_hash = $1 AND expires_at > NOW()
            "#,
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(account_id)
    }

    /// 根据ID获取账号
    pub async fn get_account(&self, account_id: Uuid) -> AppResult<Option<Account>> {
        Ok(find_account(&self.pool, account_id).await?)
    }

    /// 管理员清零推广员可提现余额 (累计收益不变)
    pub async fn clear_balance(&self, promoter_id: Uuid) -> AppResult<Account> {
        let sql = format!(
            r#"
            UPDATE accounts
            SET available_balance = 0, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );

        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(promoter_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("推广员不存在"))?;

        log::info!("Cleared available balance for promoter {}", promoter_id);

        Ok(account)
    }
}

/// 根据ID查询账号
pub(crate) async fn find_account<'e, E>(executor: E, account_id: Uuid) -> Result<Option<Account>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
    sqlx::query_as::<_, Account>(&sql)
        .bind(account_id)
        .fetch_optional(executor)
        .await
}

/// 并发注册时唯一约束冲突映射为 Conflict
fn map_unique_violation(error: sqlx::Error) -> AppError {
    match &error {
        sqlx::Error::Database(db_error) if db_error.code().as_deref() == Some("23505") => {
            AppError::conflict("用户名或邮箱已被注册")
        }
        _ => AppError::Database(error),
    }
}
