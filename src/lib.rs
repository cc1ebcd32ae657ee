// ==========================================
// 环境监测系统 - 测量数据批量导入核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 表格批量导入，先预览后确认，只落库通过校验的行
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 表头映射 / 单元格转换 / 行校验 / 流水线
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{
    ConfirmRowRequest, ImportBatchResult, ImportCommitResult, ImportRowPreview,
    MeasurementRecord,
};

// 导入
pub use importer::{ImportError, MeasurementImportPipeline, MeasurementImporter, SheetUpload};

// API
pub use api::{ApiError, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
