// CORS中间件配置
// 处理跨域请求，前端通过 Cookie 携带会话

use actix_cors::Cors;
use actix_web::http::header;

fn allowed_headers() -> Vec<header::HeaderName> {
    vec![
        header::AUTHORIZATION,
        header::ACCEPT,
        header::CONTENT_TYPE,
        header::HeaderName::from_static("x-admin-token"),
    ]
}

/// 创建CORS中间件
///
/// 未配置允许的源时仅放行本地开发地址
pub fn create_cors(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
        .allowed_headers(allowed_headers())
        .supports_credentials()
        .max_age(3600);

    if allowed_origins.is_empty() {
        cors = cors.allowed_origin_fn(|origin, _req_head| is_local_origin(origin.as_bytes()));
    } else {
        for origin in allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

fn is_local_origin(origin: &[u8]) -> bool {
    origin.starts_with(b"http://localhost")
        || origin.starts_with(b"https://localhost")
        || origin.starts_with(b"http://127.0.0.1")
        || origin.starts_with(b"https://127.0.0.1")
}
