// 加密工具函数
// 提供激活码/推广码/会话令牌生成、密码摘要、常量时间比较等安全功能

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use rand::{distributions::Alphanumeric, distributions::Uniform, Rng};
use anyhow::{Result, Context};

type HmacSha256 = Hmac<Sha256>;

/// 激活码长度
pub const ACTIVATION_CODE_LENGTH: usize = 12;

/// 推广码前缀
pub const PROMOTION_CODE_PREFIX: &str = "REF";

const UPPER_ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// 从大写字母和数字中生成随机字符串
pub fn generate_upper_alphanumeric(length: usize) -> String {
    let range = Uniform::from(0..UPPER_ALPHANUMERIC.len());
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| UPPER_ALPHANUMERIC[rng.sample(range)] as char)
        .collect()
}

/// 生成激活码 (12位大写字母数字)
pub fn generate_activation_code() -> String {
    generate_upper_alphanumeric(ACTIVATION_CODE_LENGTH)
}

/// 生成推广码 (REF + 6位大写字母数字)
pub fn generate_promotion_code() -> String {
    format!("{}{}", PROMOTION_CODE_PREFIX, generate_upper_alphanumeric(6))
}

/// 生成会话令牌
pub fn generate_session_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// 计算令牌的 SHA-256 摘要 (数据库只保存摘要)
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// 生成HMAC-SHA256签名
pub fn generate_hmac_signature(message: &str, secret: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .context("Invalid HMAC key")?;

    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// 生成密码摘要, 格式: hmac-sha256$<salt>$<digest>
pub fn hash_password(password: &str, pepper: &str) -> Result<String> {
    let salt = generate_upper_alphanumeric(16);
    let digest = generate_hmac_signature(&format!("{}{}", salt, password), pepper)?;
    Ok(format!("hmac-sha256${}${}", salt, digest))
}

/// 校验密码
pub fn verify_password(password: &str, stored: &str, pepper: &str) -> Result<bool> {
    let mut parts = stored.splitn(3, '$');
    let (scheme, salt, digest) = match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(salt), Some(digest)) => (scheme, salt, digest),
        _ => anyhow::bail!("Malformed password hash"),
    };
    if scheme != "hmac-sha256" {
        anyhow::bail!("Unsupported password hash scheme: {}", scheme);
    }

    let expected = generate_hmac_signature(&format!("{}{}", salt, password), pepper)?;
    Ok(constant_time_eq(&expected, digest))
}

/// 常量时间字符串比较 (防止时序攻击)
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (byte_a, byte_b) in a.bytes().zip(b.bytes()) {
        result |= byte_a ^ byte_b;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_activation_code() {
        let code = generate_activation_code();
        assert_eq!(code.len(), ACTIVATION_CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_ne!(generate_activation_code(), generate_activation_code());
    }

    #[test]
    fn test_generate_promotion_code() {
        let code = generate_promotion_code();
        assert!(code.starts_with(PROMOTION_CODE_PREFIX));
        assert_eq!(code.len(), 9);
    }

    #[test]
    fn test_token_hash_is_stable() {
        let token = generate_session_token();
        assert_eq!(token.len(), 64);
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_eq!(hash_token(&token).len(), 64);
        assert_ne!(hash_token(&token), token);
    }

    #[test]
    fn test_password_roundtrip() {
        let stored = hash_password("secret123", "pepper").unwrap();
        assert!(stored.starts_with("hmac-sha256$"));
        assert!(verify_password("secret123", &stored, "pepper").unwrap());
        assert!(!verify_password("secret124", &stored, "pepper").unwrap());
        assert!(!verify_password("secret123", &stored, "other-pepper").unwrap());
        assert!(verify_password("secret123", "garbage", "pepper").is_err());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("hello", "hello"));
        assert!(!constant_time_eq("hello", "world"));
        assert!(!constant_time_eq("hello", "hello world"));
    }
}
