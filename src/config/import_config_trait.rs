// ==========================================
// 环境监测系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::importer::error::ImportResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// DateOrder - 本地日期顺序
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateOrder {
    DayFirst,   // DMY
    MonthFirst, // MDY
}

impl DateOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "DMY" => Some(DateOrder::DayFirst),
            "MDY" => Some(DateOrder::MonthFirst),
            _ => None,
        }
    }
}

// ==========================================
// LocaleSettings - 本地数字/日期格式
// ==========================================
// 单元格文本先按固定格式（invariant）解析，失败后按本地格式解析
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleSettings {
    pub decimal_separator: char,
    pub group_separator: char,
    pub date_order: DateOrder,
}

impl Default for LocaleSettings {
    fn default() -> Self {
        Self {
            decimal_separator: ',',
            group_separator: '.',
            date_order: DateOrder::DayFirst,
        }
    }
}

// ==========================================
// ImportSettings - 单次导入使用的配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSettings {
    pub locale: LocaleSettings,
    pub audit_actor: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            locale: LocaleSettings::default(),
            audit_actor: "system".to_string(),
        }
    }
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取本地数字/日期格式
    ///
    /// # 默认值
    /// - 小数点 ','，千分位 '.'，日期 DMY
    async fn get_locale_settings(&self) -> ImportResult<LocaleSettings>;

    /// 获取审计日志中的操作人
    ///
    /// # 默认值
    /// - "system"
    async fn get_audit_actor(&self) -> ImportResult<String>;

    /// 读取完整导入配置
    async fn load_import_settings(&self) -> ImportResult<ImportSettings> {
        Ok(ImportSettings {
            locale: self.get_locale_settings().await?,
            audit_actor: self.get_audit_actor().await?,
        })
    }
}

// 未接入配置表时使用的固定配置
#[async_trait]
impl ImportConfigReader for ImportSettings {
    async fn get_locale_settings(&self) -> ImportResult<LocaleSettings> {
        Ok(self.locale)
    }

    async fn get_audit_actor(&self) -> ImportResult<String> {
        Ok(self.audit_actor.clone())
    }
}
