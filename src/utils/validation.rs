// 数据验证工具函数
// 提供注册信息、提现信息等输入验证

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use crate::error::AppError;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex")
    })
}

fn username_regex() -> &'static Regex {
    static USERNAME: OnceLock<Regex> = OnceLock::new();
    USERNAME.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]{3,20}$").expect("username regex"))
}

/// 验证邮箱地址格式
pub fn validate_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// 验证用户名: 字母、数字、下划线, 3-20位
pub fn validate_username(username: &str) -> bool {
    username_regex().is_match(username)
}

/// 验证密码长度
pub fn validate_password(password: &str) -> bool {
    password.chars().count() >= 6
}

/// 通用输入验证器, 收集字段错误后统一返回
pub struct InputValidator {
    errors: BTreeMap<String, Vec<String>>,
}

impl InputValidator {
    pub fn new() -> Self {
        Self {
            errors: BTreeMap::new(),
        }
    }

    /// 添加字段验证错误
    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(Vec::new)
            .push(message.to_string());
    }

    /// 验证必填字段
    pub fn validate_required(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add_error(field, "不能为空");
        }
    }

    pub fn validate_email_field(&mut self, field: &str, email: &str) {
        if !validate_email(email) {
            self.add_error(field, "请输入正确的邮箱格式");
        }
    }

    pub fn validate_username_field(&mut self, field: &str, username: &str) {
        if !validate_username(username) {
            self.add_error(field, "用户名只能包含字母、数字、下划线，长度3-20位");
        }
    }

    pub fn validate_password_field(&mut self, field: &str, password: &str) {
        if !validate_password(password) {
            self.add_error(field, "密码长度至少6位");
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 转换为错误结果
    pub fn into_result(self) -> Result<(), AppError> {
        if self.has_errors() {
            let error_msg = self
                .errors
                .iter()
                .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
                .collect::<Vec<_>>()
                .join("; ");

            return Err(AppError::validation(error_msg));
        }

        Ok(())
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// 取出必填的字符串字段
pub fn required_field<'a>(value: &'a Option<String>, message: &str) -> Result<&'a str, AppError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::validation(message)),
    }
}
