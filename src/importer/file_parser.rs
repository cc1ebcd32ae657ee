// ==========================================
// 环境监测系统 - 文件解析器实现
// ==========================================
// 阶段 0: 上传字节流 → 内存工作表
// 支持: Excel (.xlsx/.xlsm/.xls/.ods) / CSV (.csv)
// 约束: 只读取第一个工作表
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_pipeline_trait::FileParser;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use std::io::Cursor;
use std::path::Path;

// ==========================================
// SheetUpload - 上传的文件
// ==========================================
#[derive(Debug, Clone)]
pub struct SheetUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SheetUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// 从本地文件读取
    pub fn from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self { file_name, bytes })
    }

    fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
    }
}

// ==========================================
// SheetCell - 单元格
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum SheetCell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl SheetCell {
    /// 空单元格或纯空白文本
    pub fn is_blank(&self) -> bool {
        match self {
            SheetCell::Empty => true,
            SheetCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

static EMPTY_CELL: SheetCell = SheetCell::Empty;

// ==========================================
// SheetRow / Sheet
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub row_number: u32, // 表格中的绝对行号（从 1 开始）
    pub cells: Vec<SheetCell>,
}

impl SheetRow {
    pub fn new(row_number: u32, cells: Vec<SheetCell>) -> Self {
        Self { row_number, cells }
    }

    /// 按列位置（从 0 开始）取单元格，越界视为空
    pub fn cell(&self, column: usize) -> &SheetCell {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }

    /// 未映射的列视为空
    pub fn mapped_cell(&self, column: Option<usize>) -> &SheetCell {
        column.map(|c| self.cell(c)).unwrap_or(&EMPTY_CELL)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(SheetCell::is_blank)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub rows: Vec<SheetRow>,
}

impl Sheet {
    pub fn new(rows: Vec<SheetRow>) -> Self {
        Self { rows }
    }

    /// 第一个非空行即表头；其后各行为数据行
    pub fn split_header(&self) -> Option<(&SheetRow, &[SheetRow])> {
        let header_idx = self.rows.iter().position(|row| !row.is_blank())?;
        Some((&self.rows[header_idx], &self.rows[header_idx + 1..]))
    }
}

// ==========================================
// Workbook Parser 实现（calamine）
// ==========================================
pub struct WorkbookParser;

impl FileParser for WorkbookParser {
    fn parse_sheet(&self, bytes: &[u8]) -> ImportResult<Sheet> {
        // 自动识别 xlsx / xls / xlsb / ods
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

        let first_sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(ImportError::NoWorksheet)?;

        let range = workbook.worksheet_range(&first_sheet)?;
        let (start_row, start_col) = range.start().unwrap_or((0, 0));

        let rows = range
            .rows()
            .enumerate()
            .map(|(offset, data_row)| {
                // 补齐区域左侧的空列，保证列位置为绝对位置
                let mut cells = vec![SheetCell::Empty; start_col as usize];
                cells.extend(data_row.iter().map(convert_cell));
                SheetRow::new(start_row + offset as u32 + 1, cells)
            })
            .collect();

        Ok(Sheet::new(rows))
    }
}

fn convert_cell(cell: &Data) -> SheetCell {
    match cell {
        Data::Empty => SheetCell::Empty,
        Data::String(s) => SheetCell::Text(s.clone()),
        Data::Float(f) => SheetCell::Number(*f),
        Data::Int(i) => SheetCell::Number(*i as f64),
        Data::Bool(b) => SheetCell::Bool(*b),
        // as_datetime 按工作簿的 1900/1904 日期系统换算；无法换算时保留原始序列值
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(SheetCell::DateTime)
            .unwrap_or(SheetCell::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(SheetCell::DateTime)
            .unwrap_or_else(|| SheetCell::Text(s.clone())),
        Data::DurationIso(s) => SheetCell::Text(s.clone()),
        Data::Error(e) => SheetCell::Text(format!("#{:?}", e)),
    }
}

fn parse_iso_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// ==========================================
// CSV Parser 实现
// ==========================================
// CSV 没有原生类型，所有单元格均为文本
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_sheet(&self, bytes: &[u8]) -> ImportResult<Sheet> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(bytes);

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let row_number = record
                .position()
                .map(|p| p.line() as u32)
                .unwrap_or(idx as u32 + 1);

            let cells = record
                .iter()
                .map(|value| {
                    if value.is_empty() {
                        SheetCell::Empty
                    } else {
                        SheetCell::Text(value.to_string())
                    }
                })
                .collect();

            rows.push(SheetRow::new(row_number, cells));
        }

        Ok(Sheet::new(rows))
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse(&self, upload: &SheetUpload) -> ImportResult<Sheet> {
        if upload.bytes.is_empty() {
            return Err(ImportError::EmptyUpload);
        }

        match upload.extension().as_str() {
            "csv" => CsvParser.parse_sheet(&upload.bytes),
            _ => WorkbookParser.parse_sheet(&upload.bytes),
        }
    }
}
