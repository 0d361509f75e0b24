// API处理器模块
// 包含所有HTTP请求处理逻辑

pub mod account_handlers;
pub mod activation_handlers;
pub mod admin_handlers;
pub mod health_handlers;
pub mod membership_handlers;
pub mod promotion_handlers;

// 重新导出处理器
pub use account_handlers::*;
pub use activation_handlers::*;
pub use admin_handlers::*;
pub use health_handlers::*;
pub use membership_handlers::*;
pub use promotion_handlers::*;
