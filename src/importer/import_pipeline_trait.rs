// ==========================================
// 环境监测系统 - 测量数据导入 Trait
// ==========================================
// 职责: 定义导入接口（不包含实现）
// ==========================================

use crate::domain::measurement::{ConfirmRowRequest, ImportBatchResult, ImportCommitResult};
use crate::importer::error::ImportResult;
use crate::importer::file_parser::{Sheet, SheetUpload};
use async_trait::async_trait;

// ==========================================
// MeasurementImporter Trait
// ==========================================
// 用途: 测量数据导入主接口
// 实现者: MeasurementImportPipeline
#[async_trait]
pub trait MeasurementImporter: Send + Sync {
    /// 预览导入（只读，不落库）
    ///
    /// # 参数
    /// - upload: 上传的文件
    /// - default_site_id: 文件无排放源列（或单元格为空）时使用的排放源
    ///
    /// # 返回
    /// - Ok(ImportBatchResult): 每个非空数据行的校验结果
    /// - Err: 结构性错误（文件/表头/排放源来源）或参考数据读取失败
    async fn preview(
        &self,
        upload: &SheetUpload,
        default_site_id: Option<i64>,
    ) -> ImportResult<ImportBatchResult>;

    /// 确认导入
    ///
    /// # 参数
    /// - rows: 调用方回传的行（通常来自 Preview）
    ///
    /// # 返回
    /// - Ok(ImportCommitResult): 重新校验后的全部行 + 写入/失败计数
    /// - Err(NoRowsSupplied): 请求为空
    /// - Err(Persistence): 存储级故障，携带已提交行数
    ///
    /// # 说明
    /// - 使用新获取的参考数据快照重新校验，不信任调用方的校验结果
    /// - 逐行写入，非原子；单行写入失败不影响其他行
    async fn confirm(&self, rows: Vec<ConfirmRowRequest>) -> ImportResult<ImportCommitResult>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 0）
// 实现者: WorkbookParser, CsvParser
pub trait FileParser: Send + Sync {
    /// 解析字节流为工作表（仅第一个工作表）
    ///
    /// # 返回
    /// - Ok(Sheet): 行列表（含绝对行号）
    /// - Err: 文件无法读取、无工作表
    fn parse_sheet(&self, bytes: &[u8]) -> ImportResult<Sheet>;
}
