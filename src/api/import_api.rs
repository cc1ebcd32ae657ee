// ==========================================
// 环境监测系统 - 测量数据导入API
// ==========================================
// 职责: 将 SQLite 适配器接入导入流水线，对外提供预览/确认接口
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::domain::measurement::{
    ConfirmRowRequest, ImportBatchResult, ImportCommitResult, ImportRowPreview,
};
use crate::importer::{MeasurementImportPipeline, MeasurementImporter, SheetUpload};
use crate::repository::error::RepositoryError;
use crate::repository::{
    ActionLogRepository, MeasurementResultRepository, SqliteCatalogRepository,
};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// SQLite 适配器组装的导入流水线
pub type SqliteImportPipeline = MeasurementImportPipeline<
    SqliteCatalogRepository,
    MeasurementResultRepository,
    ActionLogRepository,
    ConfigManager,
>;

/// 导入API
pub struct ImportApi {
    conn: Arc<Mutex<Connection>>,
}

impl ImportApi {
    /// 打开数据库文件创建 ImportApi
    pub fn open(db_path: &str) -> ApiResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(format!("{}: {}", db_path, e)))?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 从已有连接创建（测试/嵌入场景）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 建表（幂等）
    pub fn init_database(&self) -> ApiResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        crate::db::init_schema(&conn).map_err(RepositoryError::from)?;
        info!("数据库结构已初始化");
        Ok(())
    }

    /// 组装流水线（每次调用读取最新的审计操作人配置）
    async fn create_pipeline(&self) -> ApiResult<SqliteImportPipeline> {
        let config = ConfigManager::from_connection(self.conn.clone())?;
        let actor = config.get_audit_actor().await?;

        Ok(MeasurementImportPipeline::new(
            SqliteCatalogRepository::new(self.conn.clone()),
            MeasurementResultRepository::new(self.conn.clone()),
            ActionLogRepository::new(self.conn.clone(), actor),
            config,
        ))
    }

    /// 预览上传内容
    pub async fn preview_upload(
        &self,
        upload: &SheetUpload,
        default_site_id: Option<i64>,
    ) -> ApiResult<ImportBatchResult> {
        let pipeline = self.create_pipeline().await?;
        Ok(pipeline.preview(upload, default_site_id).await?)
    }

    /// 预览本地文件
    pub async fn preview_file(
        &self,
        file_path: &Path,
        default_site_id: Option<i64>,
    ) -> ApiResult<ImportBatchResult> {
        let upload = SheetUpload::from_path(file_path).map_err(|e| {
            ApiError::InvalidInput(format!("无法读取文件 {}: {}", file_path.display(), e))
        })?;
        self.preview_upload(&upload, default_site_id).await
    }

    /// 确认导入
    pub async fn confirm(&self, rows: Vec<ConfirmRowRequest>) -> ApiResult<ImportCommitResult> {
        let pipeline = self.create_pipeline().await?;
        Ok(pipeline.confirm(rows).await?)
    }

    /// 确认预览结果
    ///
    /// # 参数
    /// - include_invalid: 是否回传预览时无效的行（确认时会重新校验）
    pub async fn confirm_preview(
        &self,
        preview: &ImportBatchResult,
        include_invalid: bool,
    ) -> ApiResult<ImportCommitResult> {
        let rows = confirm_requests(&preview.rows, include_invalid);
        self.confirm(rows).await
    }
}

/// 预览行 → 确认请求
pub fn confirm_requests(rows: &[ImportRowPreview], include_invalid: bool) -> Vec<ConfirmRowRequest> {
    rows.iter()
        .filter(|row| include_invalid || row.is_valid())
        .map(ConfirmRowRequest::from)
        .collect()
}
