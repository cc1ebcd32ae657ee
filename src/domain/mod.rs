// ==========================================
// 环境监测系统 - 领域模型层
// ==========================================
// 职责: 定义导入行、参考数据快照、审计事件
// 红线: 不含数据访问逻辑
// ==========================================

pub mod action_log;
pub mod measurement;
pub mod reference;

// 重导出核心类型
pub use action_log::{ActionLog, AuditEvent};
pub use measurement::{
    CellIssue, ConfirmRowRequest, ImportBatchResult, ImportCommitResult, ImportField,
    ImportRowInput, ImportRowPreview, MeasurementRecord,
};
pub use reference::{
    normalize_parameter_code, CatalogSnapshot, ParameterCategory, ReferenceParameter,
    ReferenceSite,
};
