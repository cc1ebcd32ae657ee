// ==========================================
// 环境监测系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod catalog_repo;
pub mod error;
pub mod measurement_repo;

// 重导出协作方接口
pub use action_log_repo::AuditSink;
pub use catalog_repo::ReferenceCatalog;
pub use measurement_repo::MeasurementWriter;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use catalog_repo::SqliteCatalogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use measurement_repo::MeasurementResultRepository;
