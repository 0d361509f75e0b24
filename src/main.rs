// 服务入口
// 加载配置、初始化数据库连接池、启动分润后台任务和HTTP服务

mod config;
mod error;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod state;
mod utils;

#[cfg(test)]
mod test_support;

use crate::config::Config;
use crate::middleware::{create_cors, RequestLogging};
use crate::routes::{configure, json_config, query_config};
use crate::services::CommissionWorker;
use crate::state::AppState;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use chrono::Local;
use log::info;
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::io::Write;
use std::time::Duration;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    let mut log_builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    log_builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S %:z"),
                record.level(),
                record.args()
            )
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e)) // 转换为 io::Result
        })
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout))
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    info!("数据库迁移完成");

    // 分润发件箱轮询
    tokio::spawn(CommissionWorker::new(db_pool.clone(), config.outbox.clone()).start());

    let bind_address = config.bind_address();
    let workers = config.server.workers;
    let allowed_origins = config.server.allowed_origins.clone();
    let app_state = web::Data::new(AppState::new(db_pool, config));

    info!("服务启动于 {}", bind_address);

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(create_cors(&allowed_origins))
            .wrap(RequestLogging)
            .app_data(app_state.clone())
            .app_data(json_config())
            .app_data(query_config())
            .configure(configure)
    });

    if let Some(workers) = workers {
        server = server.workers(workers);
    }

    server.bind(&bind_address)?.run().await?;
    info!("服务已停止");
    Ok(())
}
