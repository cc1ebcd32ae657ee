// ==========================================
// 环境监测系统 - 导入层
// ==========================================
// 职责: 表格批量导入测量数据（预览 / 确认）
// 支持: Excel (.xlsx/.xls/.ods), CSV
// ==========================================

// 模块声明
pub mod cell_coercer;
pub mod error;
pub mod file_parser;
pub mod header_mapper;
pub mod import_pipeline;
pub mod import_pipeline_trait;
pub mod row_validator;

// 重导出核心类型
pub use cell_coercer::{serial_to_datetime, CellCoercer, CellOutcome};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, Sheet, SheetCell, SheetRow, SheetUpload, UniversalFileParser, WorkbookParser};
pub use header_mapper::HeaderMap;
pub use import_pipeline::MeasurementImportPipeline;
pub use row_validator::RowValidator;

// 重导出 Trait 接口
pub use import_pipeline_trait::{FileParser, MeasurementImporter};
