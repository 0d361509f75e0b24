// 应用状态管理
// 包含数据库连接池、配置信息等全局状态

use sqlx::PgPool;
use crate::config::Config;

/// 应用全局状态
pub struct AppState {
    /// 数据库连接池
    pub db_pool: PgPool,
    /// 应用配置
    pub config: Config,
}

impl AppState {
    /// 创建新的应用状态实例
    ///
    /// # Arguments
    /// * `db_pool` - 数据库连接池
    /// * `config` - 应用配置
    pub fn new(db_pool: PgPool, config: Config) -> Self {
        Self { db_pool, config }
    }

    /// 创建测试用的应用状态
    ///
    /// 连接池为惰性连接, 不访问数据库的用例无需真实数据库
    #[cfg(test)]
    pub fn new_for_test() -> Self {
        let config = Config::default();
        let url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| config.database.url.clone());
        let db_pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect_lazy(&url)
            .expect("Invalid test database URL");

        Self::new(db_pool, config)
    }

    /// 使用已连接的测试库创建状态
    #[cfg(test)]
    pub fn with_pool_for_test(db_pool: PgPool) -> Self {
        Self::new(db_pool, Config::default())
    }
}
