// 健康检查API处理器
// 提供服务状态与数据库连接状态查询

use actix_web::{http::StatusCode, web, HttpResponse, Result as ActixResult};
use serde::Serialize;
use crate::state::AppState;

/// 系统健康检查响应
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 版本信息
    pub version: String,
    /// 数据库连接状态
    pub database: String,
    /// 当前时间戳
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// 基础健康检查
///
/// GET /health
///
/// 无需认证
/// 响应: HealthResponse, 数据库不可用时返回 503
pub async fn health_check(data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let database_ok = match sqlx::query("SELECT 1").execute(&data.db_pool).await {
        Ok(_) => true,
        Err(e) => {
            log::error!("Database health check failed: {}", e);
            false
        }
    };

    let health = HealthResponse {
        status: if database_ok { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if database_ok { "connected" } else { "disconnected" }.to_string(),
        timestamp: chrono::Utc::now(),
    };

    let status_code = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    Ok(HttpResponse::build(status_code).json(health))
}
