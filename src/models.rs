// 数据模型定义
// 包含激活码、会员、账号、推广分润、提现等核心数据结构

mod account;
mod activation_code;
mod membership;
mod promotion;
mod withdrawal;

// 重新导出核心类型
pub use account::*;
pub use activation_code::*;
pub use membership::*;
pub use promotion::*;
pub use withdrawal::*;

use serde::Serialize;

/// 错误响应格式
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}

/// 无数据的成功响应
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

impl SuccessResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// 带数据的成功响应
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { success: true, data }
    }
}

/// 分页信息
#[derive(Debug, Serialize)]
pub struct PaginationInfo {
    /// 当前页码
    pub page: u32,
    /// 每页数量
    pub limit: u32,
    /// 总记录数
    pub total: u64,
    /// 总页数
    pub pages: u32,
}

impl PaginationInfo {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let pages = ((total as f64) / (limit.max(1) as f64)).ceil() as u32;
        Self { page, limit, total, pages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_pages() {
        assert_eq!(PaginationInfo::new(1, 10, 0).pages, 0);
        assert_eq!(PaginationInfo::new(1, 10, 10).pages, 1);
        assert_eq!(PaginationInfo::new(2, 10, 11).pages, 2);
    }
}
