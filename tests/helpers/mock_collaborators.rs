// ==========================================
// Mock 协作方实现 - 用于导入流水线集成测试
// ==========================================
// 内部状态用 Arc 共享：交给流水线后测试仍可检查调用记录
// ==========================================

use async_trait::async_trait;
use env_measurement_import::config::{ImportConfigReader, LocaleSettings};
use env_measurement_import::domain::{
    AuditEvent, MeasurementRecord, ReferenceParameter, ReferenceSite,
};
use env_measurement_import::importer::{ImportError, ImportResult};
use env_measurement_import::repository::{
    AuditSink, MeasurementWriter, ReferenceCatalog, RepositoryError, RepositoryResult,
};
use std::sync::{Arc, Mutex};

// ==========================================
// InMemoryCatalog - 可变参考数据
// ==========================================
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    sites: Arc<Mutex<Vec<ReferenceSite>>>,
    parameters: Arc<Mutex<Vec<ReferenceParameter>>>,
    unavailable: Arc<Mutex<bool>>,
}

impl InMemoryCatalog {
    /// 两个排放源 + 三个参数
    pub fn standard() -> Self {
        let catalog = Self::default();
        catalog.add_site(1, "Boiler Stack 1");
        catalog.add_site(2, "Outfall A");
        catalog.add_parameter(ReferenceParameter::new(
            "PM10",
            "Particulate matter",
            Some("mg/Nm3"),
            Some("air"),
        ));
        catalog.add_parameter(ReferenceParameter::new("SO2", "Sulfur dioxide", Some("mg/Nm3"), Some("air")));
        catalog.add_parameter(ReferenceParameter::new(
            "COD",
            "Chemical oxygen demand",
            Some("mg/L"),
            Some("water"),
        ));
        catalog
    }

    pub fn add_site(&self, id: i64, name: &str) {
        self.sites.lock().unwrap().push(ReferenceSite {
            id,
            name: name.to_string(),
        });
    }

    pub fn add_parameter(&self, parameter: ReferenceParameter) {
        self.parameters.lock().unwrap().push(parameter);
    }

    /// 模拟排放源被删除（软删除后不再出现在在用列表）
    pub fn remove_site(&self, id: i64) {
        self.sites.lock().unwrap().retain(|s| s.id != id);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }
}

#[async_trait]
impl ReferenceCatalog for InMemoryCatalog {
    async fn active_sites(&self) -> RepositoryResult<Vec<ReferenceSite>> {
        if *self.unavailable.lock().unwrap() {
            return Err(RepositoryError::DatabaseConnectionError("catalog offline".to_string()));
        }
        Ok(self.sites.lock().unwrap().clone())
    }

    async fn active_parameters(&self) -> RepositoryResult<Vec<ReferenceParameter>> {
        Ok(self.parameters.lock().unwrap().clone())
    }
}

// ==========================================
// RecordingWriter - 记录每次写入调用
// ==========================================
#[derive(Clone, Default)]
pub struct RecordingWriter {
    calls: Arc<Mutex<Vec<MeasurementRecord>>>,
    reject_parameter: Option<String>,
    fatal_on_call: Option<usize>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定参数的记录返回约束错误（单行级）
    pub fn rejecting_parameter(code: &str) -> Self {
        Self {
            reject_parameter: Some(code.to_string()),
            ..Self::default()
        }
    }

    /// 第 n 次调用（从 1 开始）返回存储级故障
    pub fn failing_on_call(n: usize) -> Self {
        Self {
            fatal_on_call: Some(n),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn records(&self) -> Vec<MeasurementRecord> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MeasurementWriter for RecordingWriter {
    async fn insert_measurement(&self, record: &MeasurementRecord) -> RepositoryResult<i64> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(record.clone());
        let call_no = calls.len();

        if self.fatal_on_call == Some(call_no) {
            return Err(RepositoryError::DatabaseConnectionError("database is locked".to_string()));
        }
        if self.reject_parameter.as_deref() == Some(record.parameter_code.as_str()) {
            return Err(RepositoryError::UniqueConstraintViolation(
                "UNIQUE constraint failed: measurement_result".to_string(),
            ));
        }

        Ok(call_no as i64)
    }
}

// ==========================================
// RecordingAudit - 记录审计事件
// ==========================================
#[derive(Clone, Default)]
pub struct RecordingAudit {
    events: Arc<Mutex<Vec<AuditEvent>>>,
    fail: bool,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次写入都失败（但仍记录尝试）
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn record(&self, event: AuditEvent) -> RepositoryResult<()> {
        self.events.lock().unwrap().push(event);
        if self.fail {
            return Err(RepositoryError::DatabaseQueryError("audit table missing".to_string()));
        }
        Ok(())
    }
}

// ==========================================
// LocaleOnlyConfig - 只提供本地格式
// ==========================================
// 读取审计操作人即报错，用于确认 Preview 只依赖本地格式配置
#[derive(Clone, Default)]
pub struct LocaleOnlyConfig {
    pub locale: LocaleSettings,
}

#[async_trait]
impl ImportConfigReader for LocaleOnlyConfig {
    async fn get_locale_settings(&self) -> ImportResult<LocaleSettings> {
        Ok(self.locale)
    }

    async fn get_audit_actor(&self) -> ImportResult<String> {
        Err(ImportError::Config {
            key: "import.audit_actor".to_string(),
            message: "actor lookup is not available here".to_string(),
        })
    }
}
