// 统一错误类型
// 业务错误映射到 校验/认证/不存在/冲突/内部 五类, 并渲染为 {"error": "..."}

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;
use crate::models::ErrorResponse;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Auth => StatusCode::UNAUTHORIZED,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("激活码不存在")]
    CodeNotFound,

    #[error("激活码已被使用")]
    CodeAlreadyUsed,

    #[error("激活码已过期")]
    CodeExpired,

    #[error("您已拥有该类型的会员")]
    DuplicateMembership,

    #[error("您的下载次数已用完")]
    QuotaExhausted,

    #[error("请先开通会员")]
    NoActiveMembership,

    #[error("最小提现金额为{0}元")]
    BelowMinimumWithdrawal(rust_decimal::Decimal),

    #[error("可提现余额不足")]
    InsufficientBalance,

    #[error("提现状态不能从 {from} 变更为 {to}")]
    InvalidTransition { from: String, to: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_)
            | AppError::CodeNotFound
            | AppError::CodeExpired
            | AppError::BelowMinimumWithdrawal(_) => ErrorKind::Validation,
            AppError::Unauthorized(_) => ErrorKind::Auth,
            AppError::NotFound(_) | AppError::NoActiveMembership => ErrorKind::NotFound,
            AppError::Conflict(_)
            | AppError::CodeAlreadyUsed
            | AppError::DuplicateMembership
            | AppError::QuotaExhausted
            | AppError::InsufficientBalance
            | AppError::InvalidTransition { .. } => ErrorKind::Conflict,
            AppError::Database(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// 返回给调用方的消息, 内部错误不暴露细节
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "服务器内部错误，请稍后重试".to_string(),
            _ => self.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    fn error_response(&self) -> HttpResponse {
        if self.kind() == ErrorKind::Internal {
            log::error!("Request failed: {}", self);
        }
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.public_message()))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_error_taxonomy() {
        assert_eq!(AppError::CodeExpired.kind(), ErrorKind::Validation);
        assert_eq!(AppError::CodeAlreadyUsed.kind(), ErrorKind::Conflict);
        assert_eq!(AppError::DuplicateMembership.kind(), ErrorKind::Conflict);
        assert_eq!(AppError::InsufficientBalance.kind(), ErrorKind::Conflict);
        assert_eq!(AppError::BelowMinimumWithdrawal(Decimal::TEN).kind(), ErrorKind::Validation);
        assert_eq!(AppError::unauthorized("请先登录").kind(), ErrorKind::Auth);
        assert_eq!(AppError::not_found("提现记录不存在").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::CodeAlreadyUsed.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let err = AppError::Internal(anyhow::anyhow!("connection reset by peer"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.public_message().contains("connection reset"));
        assert_eq!(AppError::BelowMinimumWithdrawal(Decimal::TEN).public_message(), "最小提现金额为10元");
    }
}
