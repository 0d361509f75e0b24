// 服务层模块
// 包含所有业务逻辑服务

pub mod account_service;
pub mod activation_service;
pub mod code_service;
pub mod commission_service;
pub mod commission_worker;
pub mod membership_service;
pub mod promotion_service;
pub mod referral_service;
pub mod withdrawal_service;

// 重新导出服务
pub use account_service::AccountService;
pub use activation_service::ActivationService;
pub use code_service::CodeService;
pub use commission_service::CommissionService;
pub use commission_worker::CommissionWorker;
pub use membership_service::MembershipService;
pub use promotion_service::PromotionService;
pub use referral_service::ReferralService;
pub use withdrawal_service::WithdrawalService;
