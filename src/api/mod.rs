// ==========================================
// 环境监测系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令行/嵌入方调用
// ==========================================

pub mod error;
pub mod import_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{confirm_requests, ImportApi, SqliteImportPipeline};
