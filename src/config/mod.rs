// ==========================================
// 环境监测系统 - 配置层
// ==========================================
// 职责: 导入相关配置（本地数字/日期格式、审计操作人）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::{DateOrder, ImportConfigReader, ImportSettings, LocaleSettings};
