// ==========================================
// 环境监测系统 - 表头映射器实现
// ==========================================
// 职责: 自由文本表头 → 标准字段
// 规则: 仅保留字母数字 + 小写 → 查同义词表
// ==========================================

use crate::domain::measurement::ImportField;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{SheetCell, SheetRow};
use std::collections::BTreeMap;

// ==========================================
// 同义词表
// ==========================================
// 新增同义词只需在此追加，不涉及控制流
const HEADER_SYNONYMS: &[(&str, ImportField)] = &[
    ("emissionsource", ImportField::SiteId),
    ("emissionsourceid", ImportField::SiteId),
    ("sourceid", ImportField::SiteId),
    ("source", ImportField::SiteId),
    ("parameter", ImportField::ParameterCode),
    ("parametercode", ImportField::ParameterCode),
    ("measurement", ImportField::MeasurementDate),
    ("measurementdate", ImportField::MeasurementDate),
    ("measurementdatetime", ImportField::MeasurementDate),
    ("entrydate", ImportField::EntryDate),
    ("entrydatetime", ImportField::EntryDate),
    ("value", ImportField::Value),
    ("unit", ImportField::Unit),
    ("remark", ImportField::Remark),
    ("remarks", ImportField::Remark),
    ("note", ImportField::Remark),
    ("notes", ImportField::Remark),
    ("isapproved", ImportField::Approved),
    ("approved", ImportField::Approved),
    ("approval", ImportField::Approved),
    ("approvedat", ImportField::ApprovedAt),
    ("approvaldate", ImportField::ApprovedAt),
    ("approveddate", ImportField::ApprovedAt),
];

/// 表头文本标准化（仅保留字母数字并转小写）
pub fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// 查同义词表
pub fn resolve_header(raw: &str) -> Option<ImportField> {
    let normalized = normalize_header(raw);
    if normalized.is_empty() {
        return None;
    }

    HEADER_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == normalized)
        .map(|(_, field)| *field)
}

// ==========================================
// HeaderMap - 标准字段 → 列位置
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    columns: BTreeMap<ImportField, usize>,
}

impl HeaderMap {
    /// 从 (列位置, 表头文本) 序列构建
    ///
    /// 同一标准字段出现多次时，最后一次（最右列）生效；无法识别的表头忽略。
    pub fn from_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = (usize, &'a str)>,
    {
        let mut columns = BTreeMap::new();
        for (column, text) in headers {
            if let Some(field) = resolve_header(text) {
                columns.insert(field, column);
            }
        }
        Self { columns }
    }

    /// 从表头行构建（非文本单元格按显示文本处理）
    pub fn from_row(row: &SheetRow) -> Self {
        let texts: Vec<(usize, String)> = row
            .cells
            .iter()
            .enumerate()
            .filter_map(|(column, cell)| header_text(cell).map(|t| (column, t)))
            .collect();

        Self::from_headers(texts.iter().map(|(c, t)| (*c, t.as_str())))
    }

    pub fn column(&self, field: ImportField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn contains(&self, field: ImportField) -> bool {
        self.columns.contains_key(&field)
    }

    /// 已映射的列位置（去重）
    pub fn mapped_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns.values().copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = ImportField> + '_ {
        self.columns.keys().copied()
    }

    /// 必需列校验（读取任何数据行之前执行一次）
    ///
    /// ParameterCode + Value + (MeasurementDate 或 EntryDate)
    pub fn ensure_required_columns(&self) -> ImportResult<()> {
        let has_date = self.contains(ImportField::MeasurementDate)
            || self.contains(ImportField::EntryDate);

        if self.contains(ImportField::ParameterCode) && self.contains(ImportField::Value) && has_date
        {
            Ok(())
        } else {
            Err(ImportError::MissingRequiredColumns)
        }
    }
}

fn header_text(cell: &SheetCell) -> Option<String> {
    match cell {
        SheetCell::Empty => None,
        SheetCell::Text(s) => Some(s.clone()),
        SheetCell::Number(n) => Some(n.to_string()),
        SheetCell::Bool(b) => Some(b.to_string()),
        SheetCell::DateTime(dt) => Some(dt.to_string()),
    }
}
