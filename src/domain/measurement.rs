// ==========================================
// 环境监测系统 - 测量数据导入领域模型
// ==========================================
// 职责: 导入行（校验前/校验后）、确认请求、落库记录、批次结果
// 红线: 行有效性由错误列表派生，不存独立标志
// ==========================================

use crate::domain::reference::ParameterCategory;
use chrono::NaiveDateTime;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

// ==========================================
// ImportField - 标准字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ImportField {
    SiteId,
    ParameterCode,
    MeasurementDate,
    EntryDate,
    Value,
    Unit,
    Remark,
    Approved,
    ApprovedAt,
}

impl ImportField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportField::SiteId => "EmissionSourceId",
            ImportField::ParameterCode => "ParameterCode",
            ImportField::MeasurementDate => "MeasurementDate",
            ImportField::EntryDate => "EntryDate",
            ImportField::Value => "Value",
            ImportField::Unit => "Unit",
            ImportField::Remark => "Remark",
            ImportField::Approved => "IsApproved",
            ImportField::ApprovedAt => "ApprovedAt",
        }
    }
}

impl fmt::Display for ImportField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// CellIssue - 单元格解析错误
// ==========================================
// 列存在但内容无法解析（与“未填写”区分）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellIssue {
    pub field: ImportField,
    pub message: String,
}

// ==========================================
// ImportRowInput - 校验前的行数据
// ==========================================
// 生命周期: Preview 解析时创建，校验后丢弃
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportRowInput {
    pub row_number: u32,
    pub site_id: Option<i64>,
    pub parameter_code: Option<String>,
    pub measurement_date: Option<NaiveDateTime>,
    pub entry_date: Option<NaiveDateTime>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub remark: Option<String>,
    pub is_approved: Option<bool>,
    pub approved_at: Option<NaiveDateTime>,
    pub issues: Vec<CellIssue>,
}

impl ImportRowInput {
    pub fn new(row_number: u32) -> Self {
        Self {
            row_number,
            ..Default::default()
        }
    }

    pub fn has_issue_for(&self, field: ImportField) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

// ==========================================
// ImportRowPreview - 校验后的行
// ==========================================
// 用途: Preview 返回给调用方；调用方在 Confirm 时回传
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImportRowPreview {
    pub row_number: u32,
    pub site_id: Option<i64>,
    #[serde(default)]
    pub site_name: Option<String>,
    pub parameter_code: Option<String>,
    #[serde(default)]
    pub parameter_name: Option<String>,
    #[serde(default)]
    pub parameter_category: Option<ParameterCategory>,
    pub measurement_date: Option<NaiveDateTime>,
    pub entry_date: Option<NaiveDateTime>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub remark: Option<String>,
    #[serde(default)]
    pub is_approved: bool,
    pub approved_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ImportRowPreview {
    /// 有效 ⇔ 错误列表为空
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

// is_valid 在序列化时派生输出，反序列化时忽略
impl Serialize for ImportRowPreview {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ImportRowPreview", 15)?;
        state.serialize_field("row_number", &self.row_number)?;
        state.serialize_field("site_id", &self.site_id)?;
        state.serialize_field("site_name", &self.site_name)?;
        state.serialize_field("parameter_code", &self.parameter_code)?;
        state.serialize_field("parameter_name", &self.parameter_name)?;
        state.serialize_field("parameter_category", &self.parameter_category)?;
        state.serialize_field("measurement_date", &self.measurement_date)?;
        state.serialize_field("entry_date", &self.entry_date)?;
        state.serialize_field("value", &self.value)?;
        state.serialize_field("unit", &self.unit)?;
        state.serialize_field("remark", &self.remark)?;
        state.serialize_field("is_approved", &self.is_approved)?;
        state.serialize_field("approved_at", &self.approved_at)?;
        state.serialize_field("errors", &self.errors)?;
        state.serialize_field("is_valid", &self.is_valid())?;
        state.end()
    }
}

// ==========================================
// ConfirmRowRequest - 确认请求行
// ==========================================
// 调用方回传的行；显示名称等派生字段不被信任，确认时重新校验
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfirmRowRequest {
    pub row_number: u32,
    pub site_id: Option<i64>,
    pub parameter_code: Option<String>,
    pub measurement_date: Option<NaiveDateTime>,
    pub entry_date: Option<NaiveDateTime>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub remark: Option<String>,
    #[serde(default)]
    pub is_approved: bool,
    pub approved_at: Option<NaiveDateTime>,
}

impl From<ConfirmRowRequest> for ImportRowInput {
    fn from(row: ConfirmRowRequest) -> Self {
        ImportRowInput {
            row_number: row.row_number,
            site_id: row.site_id,
            parameter_code: row.parameter_code,
            measurement_date: row.measurement_date,
            entry_date: row.entry_date,
            value: row.value,
            unit: row.unit,
            remark: row.remark,
            is_approved: Some(row.is_approved),
            approved_at: row.approved_at,
            issues: Vec::new(),
        }
    }
}

impl From<&ImportRowPreview> for ConfirmRowRequest {
    fn from(row: &ImportRowPreview) -> Self {
        ConfirmRowRequest {
            row_number: row.row_number,
            site_id: row.site_id,
            parameter_code: row.parameter_code.clone(),
            measurement_date: row.measurement_date,
            entry_date: row.entry_date,
            value: row.value,
            unit: row.unit.clone(),
            remark: row.remark.clone(),
            is_approved: row.is_approved,
            approved_at: row.approved_at,
        }
    }
}

// ==========================================
// MeasurementRecord - 落库记录
// ==========================================
// 由通过校验的预览行逐字段复制构造
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub site_id: i64,
    pub parameter_code: String,
    pub measurement_date: NaiveDateTime,
    pub value: f64,
    pub unit: Option<String>,
    pub entry_date: NaiveDateTime,
    pub remark: Option<String>,
    pub is_approved: bool,
    pub approved_at: Option<NaiveDateTime>, // 仅 is_approved = true 时有值
}

impl MeasurementRecord {
    /// 从已通过校验的预览行构造
    ///
    /// # 返回
    /// - None: 行无效或缺少必填字段
    pub fn from_accepted(row: &ImportRowPreview) -> Option<Self> {
        if !row.is_valid() {
            return None;
        }

        let measurement_date = row.measurement_date?;
        Some(Self {
            site_id: row.site_id?,
            parameter_code: row.parameter_code.clone()?,
            measurement_date,
            value: row.value?,
            unit: row.unit.clone(),
            entry_date: row.entry_date.unwrap_or(measurement_date),
            remark: row.remark.clone(),
            is_approved: row.is_approved,
            approved_at: if row.is_approved { row.approved_at } else { None },
        })
    }
}

// ==========================================
// ImportBatchResult - 预览结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatchResult {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    pub rows: Vec<ImportRowPreview>,
}

impl ImportBatchResult {
    pub fn from_rows(rows: Vec<ImportRowPreview>) -> Self {
        let valid_rows = rows.iter().filter(|r| r.is_valid()).count();
        Self {
            total_rows: rows.len(),
            valid_rows,
            invalid_rows: rows.len() - valid_rows,
            rows,
        }
    }
}

// ==========================================
// ImportCommitResult - 确认导入结果
// ==========================================
// 不变量: inserted_rows + failed_rows == total_rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportCommitResult {
    pub total_rows: usize,
    pub inserted_rows: usize,
    pub failed_rows: usize,
    pub rows: Vec<ImportRowPreview>,
    pub message: String,
}

impl ImportCommitResult {
    pub fn new(rows: Vec<ImportRowPreview>, inserted_rows: usize) -> Self {
        let total_rows = rows.len();
        let message = if inserted_rows > 0 {
            format!("Imported {} of {} rows.", inserted_rows, total_rows)
        } else {
            "No measurement results were imported because every row failed validation or could not be saved."
                .to_string()
        };

        Self {
            total_rows,
            inserted_rows,
            failed_rows: total_rows - inserted_rows,
            rows,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    fn accepted_row() -> ImportRowPreview {
        ImportRowPreview {
            row_number: 2,
            site_id: Some(1),
            site_name: Some("Stack A".to_string()),
            parameter_code: Some("PM10".to_string()),
            measurement_date: Some(ts(2024, 5, 1)),
            entry_date: Some(ts(2024, 5, 2)),
            value: Some(12.5),
            unit: Some("mg/Nm3".to_string()),
            is_approved: false,
            approved_at: Some(ts(2024, 5, 3)),
            ..Default::default()
        }
    }

    #[test]
    fn test_preview_validity_follows_errors() {
        let mut row = accepted_row();
        assert!(row.is_valid());

        row.errors.push("Value is required.".to_string());
        assert!(!row.is_valid());
    }

    #[test]
    fn test_preview_serializes_derived_validity() {
        let mut row = accepted_row();
        row.errors.push("Parameter XYZ was not found.".to_string());

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["is_valid"], serde_json::json!(false));
        assert_eq!(json["measurement_date"], serde_json::json!("2024-05-01T08:30:00"));

        // 回传的 is_valid 被忽略
        let back: ImportRowPreview = serde_json::from_value(json).unwrap();
        assert_eq!(back.errors.len(), 1);
    }

    #[test]
    fn test_record_copies_fields_and_drops_unapproved_stamp() {
        let record = MeasurementRecord::from_accepted(&accepted_row()).unwrap();

        assert_eq!(record.site_id, 1);
        assert_eq!(record.parameter_code, "PM10");
        assert_eq!(record.value, 12.5);
        assert_eq!(record.entry_date, ts(2024, 5, 2));
        assert_eq!(record.approved_at, None);
    }

    #[test]
    fn test_record_rejects_invalid_row() {
        let mut row = accepted_row();
        row.errors.push("Emission source #1 was not found.".to_string());

        assert!(MeasurementRecord::from_accepted(&row).is_none());
    }

    #[test]
    fn test_commit_result_counts() {
        let rows = vec![accepted_row(), accepted_row(), accepted_row()];
        let result = ImportCommitResult::new(rows, 2);

        assert_eq!(result.total_rows, 3);
        assert_eq!(result.failed_rows, 1);
        assert_eq!(result.message, "Imported 2 of 3 rows.");

        let empty = ImportCommitResult::new(vec![accepted_row()], 0);
        assert_eq!(
            empty.message,
            "No measurement results were imported because every row failed validation or could not be saved."
        );
    }
}
