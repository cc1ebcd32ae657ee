// ==========================================
// 环境监测系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{DateOrder, ImportConfigReader, LocaleSettings};
use crate::db::open_sqlite_connection;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let config_map = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<BTreeMap<String, String>, _>>()?;

        Ok(json!(config_map).to_string())
    }

    /// 读取配置，不存在时使用默认值；存储错误归为配置错误
    fn get_config_or_default(&self, key: &str, default: &str) -> ImportResult<String> {
        let value = self
            .get_global_config_value(key)
            .map_err(|e| ImportError::Config {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        Ok(value.unwrap_or_else(|| default.to_string()))
    }

    fn get_separator(&self, key: &str, default: &str) -> ImportResult<char> {
        let value = self.get_config_or_default(key, default)?;
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_ascii_digit() => Ok(c),
            _ => Err(ImportError::Config {
                key: key.to_string(),
                message: format!("expected a single non-digit character, got {:?}", value),
            }),
        }
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_locale_settings(&self) -> ImportResult<LocaleSettings> {
        let decimal_separator = self.get_separator(config_keys::LOCAL_DECIMAL_SEPARATOR, ",")?;
        let group_separator = self.get_separator(config_keys::LOCAL_GROUP_SEPARATOR, ".")?;
        if decimal_separator == group_separator {
            return Err(ImportError::Config {
                key: config_keys::LOCAL_GROUP_SEPARATOR.to_string(),
                message: "group separator must differ from decimal separator".to_string(),
            });
        }

        let raw_order = self.get_config_or_default(config_keys::LOCAL_DATE_ORDER, "DMY")?;
        let date_order = DateOrder::parse(&raw_order).ok_or_else(|| ImportError::Config {
            key: config_keys::LOCAL_DATE_ORDER.to_string(),
            message: format!("expected DMY or MDY, got {:?}", raw_order),
        })?;

        Ok(LocaleSettings {
            decimal_separator,
            group_separator,
            date_order,
        })
    }

    async fn get_audit_actor(&self) -> ImportResult<String> {
        let value = self.get_config_or_default(config_keys::AUDIT_ACTOR, "system")?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Ok("system".to_string())
        } else {
            Ok(trimmed.to_string())
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 本地数字/日期格式（固定格式解析失败后使用）
    pub const LOCAL_DECIMAL_SEPARATOR: &str = "import.local_decimal_separator";
    pub const LOCAL_GROUP_SEPARATOR: &str = "import.local_group_separator";
    pub const LOCAL_DATE_ORDER: &str = "import.local_date_order";

    // 审计
    pub const AUDIT_ACTOR: &str = "import.audit_actor";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_keys_missing() {
        let manager = setup_manager();

        let locale = manager.get_locale_settings().await.unwrap();
        assert_eq!(locale, LocaleSettings::default());
        assert_eq!(manager.get_audit_actor().await.unwrap(), "system");
    }

    #[tokio::test]
    async fn test_overrides_are_read() {
        let manager = setup_manager();
        manager
            .set_global_config_value(config_keys::LOCAL_DECIMAL_SEPARATOR, ".")
            .unwrap();
        manager
            .set_global_config_value(config_keys::LOCAL_GROUP_SEPARATOR, ",")
            .unwrap();
        manager
            .set_global_config_value(config_keys::LOCAL_DATE_ORDER, "mdy")
            .unwrap();
        manager
            .set_global_config_value(config_keys::AUDIT_ACTOR, " qa-lab ")
            .unwrap();

        let settings = manager.load_import_settings().await.unwrap();
        assert_eq!(settings.locale.decimal_separator, '.');
        assert_eq!(settings.locale.date_order, DateOrder::MonthFirst);
        assert_eq!(settings.audit_actor, "qa-lab");

        let snapshot: serde_json::Value =
            serde_json::from_str(&manager.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot[config_keys::LOCAL_DATE_ORDER], "mdy");
    }

    #[tokio::test]
    async fn test_malformed_values_are_config_errors() {
        let manager = setup_manager();
        manager
            .set_global_config_value(config_keys::LOCAL_DATE_ORDER, "YMD")
            .unwrap();
        let err = manager.get_locale_settings().await.unwrap_err();
        assert!(matches!(err, ImportError::Config { ref key, .. } if key == config_keys::LOCAL_DATE_ORDER));

        let manager = setup_manager();
        manager
            .set_global_config_value(config_keys::LOCAL_GROUP_SEPARATOR, ",")
            .unwrap();
        assert!(manager.get_locale_settings().await.is_err());
    }
}
