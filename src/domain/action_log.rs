// ==========================================
// 环境监测系统 - 操作日志领域模型
// ==========================================
// 红线: 所有批量写入必须留痕
// 用途: 审计追踪
// 对齐: action_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// ==========================================
// AuditEvent - 审计事件（导入核心产出）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: String,      // 如 "MeasurementResult.Import"
    pub entity_type: String, // 如 "MeasurementResult"
    pub entity_id: String,   // 批量操作为 "bulk"
    pub message: String,
    pub payload: JsonValue,
}

// ==========================================
// ActionLog - 操作日志（持久化形态）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub action_ts: NaiveDateTime,
    pub actor: String,
    pub detail: Option<String>,
    pub payload_json: Option<JsonValue>,
}

impl ActionLog {
    pub fn from_event(event: AuditEvent, actor: &str, action_ts: NaiveDateTime) -> Self {
        Self {
            action_id: Uuid::new_v4().to_string(),
            action_type: event.action,
            entity_type: event.entity_type,
            entity_id: event.entity_id,
            action_ts,
            actor: actor.to_string(),
            detail: Some(event.message),
            payload_json: Some(event.payload),
        }
    }
}
