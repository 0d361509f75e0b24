// 认证提取器
// CurrentAccount: 通过会话 Cookie 或 Bearer 令牌解析当前账号
// AdminAuth: 校验 X-Admin-Token 管理员令牌

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;
use crate::error::AppError;
use crate::services::AccountService;
use crate::state::AppState;
use crate::utils::{constant_time_eq, extract_admin_token, extract_session_token};

/// 已登录账号
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentAccount(pub Uuid);

impl CurrentAccount {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl FromRequest for CurrentAccount {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = extract_session_token(req);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let token = token.ok_or_else(|| AppError::unauthorized("请先登录"))?;
            let state = state.ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("Application state is not configured"))
            })?;

            let account_service = AccountService::new(
                state.db_pool.clone(),
                state.config.security.password_pepper.clone(),
            );

            account_service
                .resolve_session(&token)
                .await?
                .map(CurrentAccount)
                .ok_or_else(|| AppError::unauthorized("登录已过期，请重新登录"))
        })
    }
}

/// 管理员身份
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

impl FromRequest for AdminAuth {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            return ready(Err(AppError::Internal(anyhow::anyhow!(
                "Application state is not configured"
            ))));
        };

        let result = match extract_admin_token(req) {
            Some(token) if constant_time_eq(&token, &state.config.security.admin_token) => Ok(AdminAuth),
            Some(_) => {
                log::warn!("Rejected admin request with invalid token: {}", req.path());
                Err(AppError::unauthorized("管理员令牌无效"))
            }
            None => Err(AppError::unauthorized("缺少管理员令牌")),
        };

        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use crate::utils::ADMIN_TOKEN_HEADER;

    #[actix_web::test]
    async fn test_admin_auth_accepts_configured_token() {
        let state = web::Data::new(AppState::new_for_test());
        let token = state.config.security.admin_token.clone();

        let (req, mut payload) = TestRequest::default()
            .app_data(state.clone())
            .insert_header((ADMIN_TOKEN_HEADER, token))
            .to_http_parts();
        assert!(AdminAuth::from_request(&req, &mut payload).await.is_ok());

        let (req, mut payload) = TestRequest::default()
            .app_data(state.clone())
            .insert_header((ADMIN_TOKEN_HEADER, "wrong-token"))
            .to_http_parts();
        assert!(matches!(
            AdminAuth::from_request(&req, &mut payload).await,
            Err(AppError::Unauthorized(_))
        ));

        let (req, mut payload) = TestRequest::default().app_data(state).to_http_parts();
        assert!(matches!(
            AdminAuth::from_request(&req, &mut payload).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[actix_web::test]
    async fn test_current_account_requires_token() {
        let state = web::Data::new(AppState::new_for_test());
        let (req, mut payload) = TestRequest::default().app_data(state).to_http_parts();

        assert!(matches!(
            CurrentAccount::from_request(&req, &mut payload).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
