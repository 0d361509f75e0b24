// 工具函数模块
// 包含加密、验证、二维码生成、结算日期等通用工具

pub mod crypto;
pub mod auth;
pub mod qr;
pub mod settlement;
pub mod validation;

// 重新导出常用函数
pub use crypto::*;
pub use auth::*;
pub use qr::*;
pub use settlement::*;
pub use validation::*;
