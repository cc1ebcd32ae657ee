// ==========================================
// 环境监测系统 - 操作日志数据仓储
// ==========================================
// 对齐: action_log 表
// 红线: 所有批量写入必须记录
// ==========================================

use crate::domain::action_log::{ActionLog, AuditEvent};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// AuditSink Trait
// ==========================================
// 用途: 导入核心写审计事件
// 约束: 调用方吞掉失败（仅告警），审计失败不影响导入结果
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> RepositoryResult<()>;
}

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
    actor: String,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储
    ///
    /// # 参数
    /// - `actor`: 写入 action_log.actor 的操作人
    pub fn new(conn: Arc<Mutex<Connection>>, actor: impl Into<String>) -> Self {
        Self {
            conn,
            actor: actor.into(),
        }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入操作日志
    ///
    /// # 返回
    /// - `Ok(action_id)`: 成功插入,返回action_id
    /// - `Err(...)`: 数据库错误
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO action_log (
                action_id, action_type, entity_type, entity_id,
                action_ts, actor, payload_json, detail
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                log.action_id,
                log.action_type,
                log.entity_type,
                log.entity_id,
                log.action_ts.format("%Y-%m-%d %H:%M:%S").to_string(),
                log.actor,
                log.payload_json.as_ref().map(|v| v.to_string()),
                log.detail,
            ],
        )?;

        Ok(log.action_id.clone())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按动作类型查询（时间倒序）
    pub fn find_by_action_type(&self, action_type: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, action_type, entity_type, entity_id,
                   action_ts, actor, detail, payload_json
            FROM action_log
            WHERE action_type = ?1
            ORDER BY action_ts DESC
            "#,
        )?;

        let logs = stmt
            .query_map(params![action_type], |row| {
                let action_ts: String = row.get(4)?;
                let payload: Option<String> = row.get(7)?;
                Ok(ActionLog {
                    action_id: row.get(0)?,
                    action_type: row.get(1)?,
                    entity_type: row.get(2)?,
                    entity_id: row.get(3)?,
                    action_ts: chrono::NaiveDateTime::parse_from_str(
                        &action_ts,
                        "%Y-%m-%d %H:%M:%S",
                    )
                    .unwrap_or_default(),
                    actor: row.get(5)?,
                    detail: row.get(6)?,
                    payload_json: payload.and_then(|s| serde_json::from_str(&s).ok()),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(logs)
    }
}

#[async_trait]
impl AuditSink for ActionLogRepository {
    async fn record(&self, event: AuditEvent) -> RepositoryResult<()> {
        let log = ActionLog::from_event(event, &self.actor, Utc::now().naive_utc());
        self.insert(&log)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup_test_db() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    #[tokio::test]
    async fn test_record_event_with_actor() {
        let repo = ActionLogRepository::new(setup_test_db(), "lab-operator");

        repo.record(AuditEvent {
            action: "MeasurementResult.Import".to_string(),
            entity_type: "MeasurementResult".to_string(),
            entity_id: "bulk".to_string(),
            message: "Imported 2 measurement results.".to_string(),
            payload: json!({ "inserted": 2, "total": 3 }),
        })
        .await
        .unwrap();

        let logs = repo.find_by_action_type("MeasurementResult.Import").unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].actor, "lab-operator");
        assert_eq!(logs[0].entity_id, "bulk");
        assert_eq!(logs[0].detail.as_deref(), Some("Imported 2 measurement results."));
        assert_eq!(logs[0].payload_json, Some(json!({ "inserted": 2, "total": 3 })));
    }
}
