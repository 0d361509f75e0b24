// 请求日志中间件
// 记录方法、路径、耗时和状态码; 健康检查只在 debug 级别输出

use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures_util::future::{ok, Ready};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

/// 请求日志中间件
pub struct RequestLogging;

impl<S, B> Transform<S, ServiceRequest> for RequestLogging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestLoggingMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequestLoggingMiddleware { service })
    }
}

pub struct RequestLoggingMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggingMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let peer = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("-")
            .to_string();

        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;
            let elapsed_ms = started.elapsed().as_millis();

            match &result {
                Ok(response) => {
                    let status = response.status();
                    let level = log_level(&path, status.as_u16());
                    log::log!(
                        level,
                        "{} {} {} {} {}ms",
                        peer, method, path, status.as_u16(), elapsed_ms
                    );
                }
                Err(e) => {
                    log::error!("{} {} {} failed after {}ms: {}", peer, method, path, elapsed_ms, e);
                }
            }

            result
        })
    }
}

/// 按状态码选择日志级别
fn log_level(path: &str, status: u16) -> log::Level {
    match status {
        500..=599 => log::Level::Error,
        400..=499 => log::Level::Warn,
        _ if path == "/health" => log::Level::Debug,
        _ => log::Level::Info,
    }
}
