// ==========================================
// 环境监测系统 - 行校验器
// ==========================================
// 职责: ImportRowInput + 参考数据快照 → ImportRowPreview
// 红线: 纯函数，不访问存储；Preview 与 Confirm 共用同一校验逻辑
// 规则: 全部检查都执行并累积错误，不因首个错误短路
// ==========================================

use crate::domain::measurement::{ImportField, ImportRowInput, ImportRowPreview};
use crate::domain::reference::{normalize_parameter_code, CatalogSnapshot};
use chrono::NaiveDateTime;

pub struct RowValidator;

impl RowValidator {
    /// 校验单行
    ///
    /// # 参数
    /// - input: 转换后的行数据（含单元格解析错误）
    /// - snapshot: 本次调用获取的参考数据快照
    /// - now: 当前时间（录入时间 / 审批时间的兜底值）
    ///
    /// # 检查顺序
    /// 1. 单元格解析错误原样带入
    /// 2. 排放源 ID 必填且存在
    /// 3. 参数代码必填且存在（带出名称/类别/默认单位）
    /// 4. 测量时间 = 测量时间 ?? 录入时间
    /// 5. 录入时间 = 录入时间 ?? 测量时间 ?? now
    /// 6. 测量值必填
    /// 7. 已审批但无审批时间 → now
    pub fn validate(
        input: ImportRowInput,
        snapshot: &CatalogSnapshot,
        now: NaiveDateTime,
    ) -> ImportRowPreview {
        let has_value_issue = input.has_issue_for(ImportField::Value);

        let mut preview = ImportRowPreview {
            row_number: input.row_number,
            site_id: input.site_id,
            unit: clean_text(input.unit),
            remark: clean_text(input.remark),
            value: input.value,
            is_approved: input.is_approved.unwrap_or(false),
            approved_at: input.approved_at,
            errors: input.issues.into_iter().map(|issue| issue.message).collect(),
            ..Default::default()
        };

        // 2. 排放源
        match input.site_id {
            None => preview
                .errors
                .push("Emission source ID is required.".to_string()),
            Some(site_id) => match snapshot.site_name(site_id) {
                Some(name) => preview.site_name = Some(name.to_string()),
                None => preview
                    .errors
                    .push(format!("Emission source #{} was not found.", site_id)),
            },
        }

        // 3. 参数
        let code = input
            .parameter_code
            .as_deref()
            .map(normalize_parameter_code)
            .filter(|c| !c.is_empty());
        match code {
            None => preview.errors.push("Parameter code is required.".to_string()),
            Some(code) => {
                match snapshot.parameter(&code) {
                    Some(parameter) => {
                        preview.parameter_name = Some(parameter.name.clone());
                        preview.parameter_category = Some(parameter.category);
                        if preview.unit.is_none() {
                            preview.unit = parameter.unit.clone();
                        }
                    }
                    None => preview
                        .errors
                        .push(format!("Parameter {} was not found.", code)),
                }
                preview.parameter_code = Some(code);
            }
        }

        // 4-5. 测量时间 / 录入时间
        let measurement_date = input.measurement_date.or(input.entry_date);
        match measurement_date {
            Some(measured) => {
                preview.measurement_date = Some(measured);
                preview.entry_date = Some(input.entry_date.unwrap_or(measured));
            }
            None => {
                preview
                    .errors
                    .push("Measurement date is required.".to_string());
                preview.entry_date = Some(input.entry_date.unwrap_or(now));
            }
        }

        // 6. 测量值（已有格式错误时不重复提示）
        if preview.value.is_none() && !has_value_issue {
            preview.errors.push("Value is required.".to_string());
        }

        // 7. 审批时间
        if preview.is_approved && preview.approved_at.is_none() {
            preview.approved_at = Some(now);
        }

        preview
    }
}

fn clean_text(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
