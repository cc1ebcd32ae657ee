// ==========================================
// 环境监测系统 - 测量结果仓储
// ==========================================
// 职责: 测量结果落库（逐条写入）
// 红线: Repository 不含业务规则，只做数据映射
// ==========================================

use crate::domain::measurement::MeasurementRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// MeasurementWriter Trait
// ==========================================
// 用途: 确认导入时的逐条写入
// 实现者: MeasurementResultRepository
#[async_trait]
pub trait MeasurementWriter: Send + Sync {
    /// 插入单条测量结果
    ///
    /// # 返回
    /// - Ok(id): 新记录 ID
    /// - Err: 单条记录错误（约束/字段值）或存储级故障（见 RepositoryError::is_fatal）
    async fn insert_measurement(&self, record: &MeasurementRecord) -> RepositoryResult<i64>;
}

// ==========================================
// MeasurementResultRepository
// ==========================================
pub struct MeasurementResultRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MeasurementResultRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 统计记录数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM measurement_result", [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }

    /// 按排放源查询（测量时间升序）
    pub fn find_by_site(&self, site_id: i64) -> RepositoryResult<Vec<MeasurementRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT emission_source_id, parameter_code, measurement_date, value, unit,
                   entry_date, remark, is_approved, approved_at
            FROM measurement_result
            WHERE emission_source_id = ?1
            ORDER BY measurement_date, id
            "#,
        )?;

        // rusqlite chrono 特性: NaiveDateTime <-> "YYYY-MM-DD HH:MM:SS.fff"
        let records = stmt
            .query_map(params![site_id], |row| {
                Ok(MeasurementRecord {
                    site_id: row.get(0)?,
                    parameter_code: row.get(1)?,
                    measurement_date: row.get(2)?,
                    value: row.get(3)?,
                    unit: row.get(4)?,
                    entry_date: row.get(5)?,
                    remark: row.get(6)?,
                    is_approved: row.get::<_, i64>(7)? != 0,
                    approved_at: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

#[async_trait]
impl MeasurementWriter for MeasurementResultRepository {
    async fn insert_measurement(&self, record: &MeasurementRecord) -> RepositoryResult<i64> {
        if !record.value.is_finite() {
            return Err(RepositoryError::FieldValueError {
                field: "value".to_string(),
                message: format!("non-finite value {}", record.value),
            });
        }

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO measurement_result (
                emission_source_id, parameter_code, measurement_date, value, unit,
                entry_date, remark, is_approved, approved_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.site_id,
                record.parameter_code,
                record.measurement_date,
                record.value,
                record.unit,
                record.entry_date,
                record.remark,
                record.is_approved as i64,
                record.approved_at,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }
}
