// ==========================================
// 环境监测系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 错误文本直接面向导入操作人员
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
///
/// 结构性错误在任何行结果产生之前中止整个操作；行级错误不在此列，
/// 它们以字符串形式挂在各自的行上。
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 结构性错误（文件/表头）=====
    #[error("Please choose an Excel file to import.")]
    EmptyUpload,

    #[error("Unable to read the Excel file. {0}")]
    UnreadableFile(String),

    #[error("The uploaded file does not contain any worksheets.")]
    NoWorksheet,

    #[error("The uploaded file is missing a header row.")]
    MissingHeaderRow,

    #[error("The file must include ParameterCode, Value, and either MeasurementDate or EntryDate columns.")]
    MissingRequiredColumns,

    #[error("Select an emission source or include an EmissionSourceID column in the file.")]
    MissingSiteSource,

    #[error("Emission source #{0} was not found.")]
    DefaultSiteNotFound(i64),

    #[error("The uploaded file does not contain any readable data rows.")]
    NoDataRows,

    #[error("No rows were supplied for import.")]
    NoRowsSupplied,

    // ===== 外部协作方错误 =====
    #[error("Unable to load reference data: {0}")]
    Catalog(#[source] RepositoryError),

    #[error("Saving measurement results failed after {inserted} row(s) were committed: {message}")]
    Persistence { inserted: usize, message: String },

    #[error("Import configuration is invalid (key: {key}): {message}")]
    Config { key: String, message: String },
}

impl ImportError {
    /// 是否为结构性错误（无任何行数据）
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ImportError::EmptyUpload
                | ImportError::UnreadableFile(_)
                | ImportError::NoWorksheet
                | ImportError::MissingHeaderRow
                | ImportError::MissingRequiredColumns
                | ImportError::MissingSiteSource
                | ImportError::DefaultSiteNotFound(_)
                | ImportError::NoDataRows
                | ImportError::NoRowsSupplied
        )
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::UnreadableFile(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::UnreadableFile(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
