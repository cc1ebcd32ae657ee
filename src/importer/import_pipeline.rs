// ==========================================
// 环境监测系统 - 测量数据导入流水线
// ==========================================
// 职责: 编排 Preview（只读）与 Confirm（落库 + 审计）
// 流程: 解析 → 表头映射 → 逐行转换 → 逐行校验 → 汇总
// 红线: Preview 绝不写库；Confirm 必须基于新快照重新校验
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::action_log::AuditEvent;
use crate::domain::measurement::{
    ConfirmRowRequest, ImportBatchResult, ImportCommitResult, ImportField, ImportRowInput,
    ImportRowPreview, MeasurementRecord,
};
use crate::domain::reference::CatalogSnapshot;
use crate::importer::cell_coercer::CellCoercer;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{SheetUpload, UniversalFileParser};
use crate::importer::header_mapper::HeaderMap;
use crate::importer::import_pipeline_trait::MeasurementImporter;
use crate::importer::row_validator::RowValidator;
use crate::repository::{AuditSink, MeasurementWriter, ReferenceCatalog};
use chrono::{NaiveDateTime, Utc};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

pub const AUDIT_ACTION_IMPORT: &str = "MeasurementResult.Import";
pub const AUDIT_ENTITY_MEASUREMENT: &str = "MeasurementResult";

// ==========================================
// MeasurementImportPipeline - 导入流水线
// ==========================================
pub struct MeasurementImportPipeline<C, W, A, R>
where
    C: ReferenceCatalog,
    W: MeasurementWriter,
    A: AuditSink,
    R: ImportConfigReader,
{
    // 外部协作方
    catalog: C,
    writer: W,
    audit: A,

    // 配置读取器
    config: R,

    file_parser: UniversalFileParser,
}

impl<C, W, A, R> MeasurementImportPipeline<C, W, A, R>
where
    C: ReferenceCatalog,
    W: MeasurementWriter,
    A: AuditSink,
    R: ImportConfigReader,
{
    /// 创建新的导入流水线
    ///
    /// # 参数
    /// - catalog: 参考数据（排放源/参数）
    /// - writer: 测量结果写入
    /// - audit: 审计事件写入
    /// - config: 本地格式配置
    pub fn new(catalog: C, writer: W, audit: A, config: R) -> Self {
        Self {
            catalog,
            writer,
            audit,
            config,
            file_parser: UniversalFileParser,
        }
    }

    /// 获取参考数据快照（每次调用重新获取）
    async fn load_snapshot(&self) -> ImportResult<CatalogSnapshot> {
        let sites = self
            .catalog
            .active_sites()
            .await
            .map_err(ImportError::Catalog)?;
        let parameters = self
            .catalog
            .active_parameters()
            .await
            .map_err(ImportError::Catalog)?;

        let snapshot = CatalogSnapshot::new(sites, parameters);
        debug!(
            sites = snapshot.site_count(),
            parameters = snapshot.parameter_count(),
            "参考数据快照已加载"
        );
        Ok(snapshot)
    }

    /// 审计写入失败只告警
    async fn emit_audit(&self, inserted: usize, total: usize) {
        let event = AuditEvent {
            action: AUDIT_ACTION_IMPORT.to_string(),
            entity_type: AUDIT_ENTITY_MEASUREMENT.to_string(),
            entity_id: "bulk".to_string(),
            message: format!("Imported {} measurement results.", inserted),
            payload: json!({ "inserted": inserted, "total": total }),
        };

        if let Err(e) = self.audit.record(event).await {
            warn!(error = %e, inserted, "审计日志写入失败，已忽略");
        }
    }
}

fn current_time() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[async_trait::async_trait]
impl<C, W, A, R> MeasurementImporter for MeasurementImportPipeline<C, W, A, R>
where
    C: ReferenceCatalog,
    W: MeasurementWriter,
    A: AuditSink,
    R: ImportConfigReader,
{
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name))]
    async fn preview(
        &self,
        upload: &SheetUpload,
        default_site_id: Option<i64>,
    ) -> ImportResult<ImportBatchResult> {
        info!(bytes = upload.bytes.len(), ?default_site_id, "开始预览导入");

        // === 阶段 0: 文件解析 ===
        let sheet = self.file_parser.parse(upload)?;
        let (header_row, data_rows) = sheet.split_header().ok_or(ImportError::MissingHeaderRow)?;
        debug!(header_row = header_row.row_number, data_rows = data_rows.len(), "文件解析完成");

        // === 阶段 1: 表头映射（读取数据行之前校验一次）===
        let header_map = HeaderMap::from_row(header_row);
        header_map.ensure_required_columns()?;
        if !header_map.contains(ImportField::SiteId) && default_site_id.is_none() {
            return Err(ImportError::MissingSiteSource);
        }
        debug!(fields = ?header_map.fields().collect::<Vec<_>>(), "表头映射完成");

        // === 阶段 2: 本地格式配置 + 参考数据快照 ===
        let locale = self.config.get_locale_settings().await?;
        let snapshot = self.load_snapshot().await?;
        if let Some(site_id) = default_site_id {
            if !snapshot.contains_site(site_id) {
                return Err(ImportError::DefaultSiteNotFound(site_id));
            }
        }

        // === 阶段 3: 逐行转换 + 校验 ===
        let coercer = CellCoercer::new(locale);
        let now = current_time();
        let mut rows = Vec::with_capacity(data_rows.len());
        let mut skipped_blank = 0usize;

        for data_row in data_rows {
            let Some(mut input) = coercer.coerce_row(data_row, &header_map) else {
                skipped_blank += 1;
                continue;
            };

            // 单元格为空时使用默认排放源（格式错误的单元格不覆盖）
            if input.site_id.is_none() && !input.has_issue_for(ImportField::SiteId) {
                input.site_id = default_site_id;
            }

            rows.push(RowValidator::validate(input, &snapshot, now));
        }

        if rows.is_empty() {
            return Err(ImportError::NoDataRows);
        }

        let result = ImportBatchResult::from_rows(rows);
        info!(
            total_rows = result.total_rows,
            valid_rows = result.valid_rows,
            invalid_rows = result.invalid_rows,
            skipped_blank,
            "预览完成"
        );
        Ok(result)
    }

    #[instrument(skip(self, rows), fields(requested = rows.len()))]
    async fn confirm(&self, rows: Vec<ConfirmRowRequest>) -> ImportResult<ImportCommitResult> {
        if rows.is_empty() {
            return Err(ImportError::NoRowsSupplied);
        }
        info!(rows = rows.len(), "开始确认导入");

        // 新快照重新校验，不信任调用方回传的校验结果
        let snapshot = self.load_snapshot().await?;
        let now = current_time();
        let mut previews: Vec<ImportRowPreview> = rows
            .into_iter()
            .map(|row| RowValidator::validate(ImportRowInput::from(row), &snapshot, now))
            .collect();

        let total = previews.len();
        let mut inserted = 0usize;

        for preview in previews.iter_mut() {
            let Some(record) = MeasurementRecord::from_accepted(preview) else {
                continue;
            };

            match self.writer.insert_measurement(&record).await {
                Ok(id) => {
                    inserted += 1;
                    debug!(row_number = preview.row_number, id, "测量结果已写入");
                }
                Err(e) if e.is_fatal() => {
                    error!(row_number = preview.row_number, inserted, error = %e, "存储故障，中止导入");
                    if inserted > 0 {
                        self.emit_audit(inserted, total).await;
                    }
                    return Err(ImportError::Persistence {
                        inserted,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(row_number = preview.row_number, error = %e, "单行写入失败");
                    preview
                        .errors
                        .push(format!("Unable to save this row: {}", e));
                }
            }
        }

        if inserted > 0 {
            self.emit_audit(inserted, total).await;
        }

        let result = ImportCommitResult::new(previews, inserted);
        info!(
            total_rows = result.total_rows,
            inserted_rows = result.inserted_rows,
            failed_rows = result.failed_rows,
            "确认导入完成"
        );
        Ok(result)
    }
}
