// ==========================================
// 环境监测系统 - 参考数据仓储
// ==========================================
// 职责: 读取在用的排放源 / 监测参数（只读）
// 红线: 不缓存，每次调用反映最新已提交状态
// ==========================================

use crate::domain::reference::{ReferenceParameter, ReferenceSite};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ReferenceCatalog Trait
// ==========================================
// 用途: 导入核心读取参考数据的唯一入口
// 实现者: SqliteCatalogRepository
#[async_trait]
pub trait ReferenceCatalog: Send + Sync {
    /// 在用排放源（未删除）
    async fn active_sites(&self) -> RepositoryResult<Vec<ReferenceSite>>;

    /// 在用监测参数（未删除）
    async fn active_parameters(&self) -> RepositoryResult<Vec<ReferenceParameter>>;
}

// ==========================================
// SqliteCatalogRepository
// ==========================================
pub struct SqliteCatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl ReferenceCatalog for SqliteCatalogRepository {
    async fn active_sites(&self) -> RepositoryResult<Vec<ReferenceSite>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name FROM emission_source WHERE is_deleted = 0 ORDER BY id",
        )?;

        let sites = stmt
            .query_map([], |row| {
                Ok(ReferenceSite {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sites)
    }

    async fn active_parameters(&self) -> RepositoryResult<Vec<ReferenceParameter>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT code, name, unit, category FROM parameter WHERE is_deleted = 0 ORDER BY code",
        )?;

        let parameters = stmt
            .query_map([], |row| {
                let code: String = row.get(0)?;
                let name: String = row.get(1)?;
                let unit: Option<String> = row.get(2)?;
                let category: Option<String> = row.get(3)?;
                Ok(ReferenceParameter::new(
                    &code,
                    &name,
                    unit.as_deref(),
                    category.as_deref(),
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(parameters)
    }
}
