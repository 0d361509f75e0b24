// 中间件模块
// 包含认证提取器、请求日志、CORS 配置

pub mod auth;
pub mod logging;
pub mod cors;

// 重新导出中间件
pub use auth::*;
pub use logging::*;
pub use cors::*;
