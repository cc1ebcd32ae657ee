// ==========================================
// 环境监测系统 - 单元格类型转换器
// ==========================================
// 职责: 单元格 → 类型化值（整数/浮点/布尔/日期/文本）
// 三态: 空 / 有效 / 有值但无法解析
// 顺序: 原生类型 → 固定格式文本 → 本地格式文本
// ==========================================

use crate::config::import_config_trait::{DateOrder, LocaleSettings};
use crate::domain::measurement::{CellIssue, ImportField, ImportRowInput};
use crate::importer::file_parser::{SheetCell, SheetRow};
use crate::importer::header_mapper::HeaderMap;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};

// ==========================================
// 表格序列日期（OLE Automation）
// ==========================================
const MS_PER_DAY: i64 = 86_400_000;
const OA_DATE_MIN: f64 = -657_435.0; // 0100-01-01
const OA_DATE_MAX: f64 = 2_958_466.0; // 10000-01-01

/// 表格序列日期 → 时间（纪元 1899-12-30）
///
/// 负数的小数部分按正向时间处理：-1.25 表示 1899-12-29 06:00。
/// 超出 (-657435, 2958466) 返回 None。
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial <= OA_DATE_MIN || serial >= OA_DATE_MAX {
        return None;
    }

    let half = if serial >= 0.0 { 0.5 } else { -0.5 };
    let mut millis = (serial * MS_PER_DAY as f64 + half) as i64;
    if millis < 0 {
        millis -= (millis % MS_PER_DAY) * 2;
    }

    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    epoch.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}

// ==========================================
// CellOutcome - 单元格解析结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum CellOutcome<T> {
    Empty,
    Valid(T),
    Invalid,
}

impl<T> CellOutcome<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            CellOutcome::Valid(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, CellOutcome::Invalid)
    }
}

// 固定格式（invariant）日期时间，按顺序尝试
const INVARIANT_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

const INVARIANT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %b %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%B %d %Y",
];

const DAY_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

const DAY_FIRST_DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d.%m.%Y", "%d-%m-%Y"];

const MONTH_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%m.%d.%Y %H:%M:%S",
    "%m.%d.%Y %H:%M",
    "%m-%d-%Y %H:%M:%S",
    "%m-%d-%Y %H:%M",
];

const MONTH_FIRST_DATE_FORMATS: &[&str] = &["%m.%d.%Y", "%m-%d-%Y"];

// ==========================================
// CellCoercer
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct CellCoercer {
    locale: LocaleSettings,
}

impl CellCoercer {
    pub fn new(locale: LocaleSettings) -> Self {
        Self { locale }
    }

    /// 文本：去首尾空白；数值按最短形式输出（3.0 → "3"）
    pub fn coerce_string(&self, cell: &SheetCell) -> Option<String> {
        match cell {
            SheetCell::Empty => None,
            SheetCell::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            SheetCell::Number(n) => Some(n.to_string()),
            SheetCell::Bool(b) => Some(b.to_string()),
            SheetCell::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    /// 整数：数值单元格四舍六入五成双；文本仅允许可选符号 + 数字
    pub fn coerce_int(&self, cell: &SheetCell) -> CellOutcome<i64> {
        if cell.is_blank() {
            return CellOutcome::Empty;
        }

        match cell {
            SheetCell::Number(n) => round_to_i64(*n)
                .map(CellOutcome::Valid)
                .unwrap_or(CellOutcome::Invalid),
            SheetCell::Text(s) => parse_integer_text(s.trim())
                .map(CellOutcome::Valid)
                .unwrap_or(CellOutcome::Invalid),
            _ => CellOutcome::Invalid,
        }
    }

    /// 浮点：固定格式（'.' 小数点，',' 千分位）优先，其次本地格式
    pub fn coerce_float(&self, cell: &SheetCell) -> CellOutcome<f64> {
        if cell.is_blank() {
            return CellOutcome::Empty;
        }

        match cell {
            SheetCell::Number(n) if n.is_finite() => CellOutcome::Valid(*n),
            SheetCell::Text(s) => {
                let text = s.trim();
                parse_grouped(text, '.', ',')
                    .or_else(|| {
                        parse_grouped(
                            text,
                            self.locale.decimal_separator,
                            self.locale.group_separator,
                        )
                    })
                    .map(CellOutcome::Valid)
                    .unwrap_or(CellOutcome::Invalid)
            }
            _ => CellOutcome::Invalid,
        }
    }

    /// 布尔：原生布尔；true/false；任意整数（非零为真）；yes/no
    pub fn coerce_bool(&self, cell: &SheetCell) -> CellOutcome<bool> {
        if cell.is_blank() {
            return CellOutcome::Empty;
        }

        match cell {
            SheetCell::Bool(b) => CellOutcome::Valid(*b),
            SheetCell::Number(n) if n.fract() == 0.0 => CellOutcome::Valid(*n != 0.0),
            SheetCell::Text(s) => parse_bool_text(s.trim())
                .map(CellOutcome::Valid)
                .unwrap_or(CellOutcome::Invalid),
            _ => CellOutcome::Invalid,
        }
    }

    /// 日期时间：原生日期；文本（固定格式 → 本地日/月顺序）；数值按序列日期
    pub fn coerce_datetime(&self, cell: &SheetCell) -> CellOutcome<NaiveDateTime> {
        if cell.is_blank() {
            return CellOutcome::Empty;
        }

        let parsed = match cell {
            SheetCell::DateTime(dt) => Some(*dt),
            SheetCell::Number(n) => serial_to_datetime(*n),
            SheetCell::Text(s) => self.parse_datetime_text(s.trim()),
            _ => None,
        };

        parsed
            .map(CellOutcome::Valid)
            .unwrap_or(CellOutcome::Invalid)
    }

    fn parse_datetime_text(&self, text: &str) -> Option<NaiveDateTime> {
        let (local_datetime, local_date) = match self.locale.date_order {
            DateOrder::DayFirst => (DAY_FIRST_DATETIME_FORMATS, DAY_FIRST_DATE_FORMATS),
            DateOrder::MonthFirst => (MONTH_FIRST_DATETIME_FORMATS, MONTH_FIRST_DATE_FORMATS),
        };

        try_formats(text, INVARIANT_DATETIME_FORMATS, INVARIANT_DATE_FORMATS)
            .or_else(|| try_formats(text, local_datetime, local_date))
            // 带时区偏移：保留书写的本地时间
            .or_else(|| {
                DateTime::parse_from_rfc3339(text)
                    .ok()
                    .map(|dt| dt.naive_local())
            })
            .or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .and_then(serial_to_datetime)
            })
    }

    /// 单行转换
    ///
    /// # 返回
    /// - None: 所有已映射列均为空（空白分隔行，不计入结果）
    /// - Some: 行数据 + 单元格解析错误
    pub fn coerce_row(&self, row: &SheetRow, header_map: &HeaderMap) -> Option<ImportRowInput> {
        if header_map
            .mapped_columns()
            .all(|column| row.cell(column).is_blank())
        {
            return None;
        }

        let cell = |field: ImportField| row.mapped_cell(header_map.column(field));

        let mut input = ImportRowInput::new(row.row_number);

        input.site_id = take(
            self.coerce_int(cell(ImportField::SiteId)),
            ImportField::SiteId,
            "Emission source ID is invalid.",
            &mut input.issues,
        );
        input.parameter_code = self.coerce_string(cell(ImportField::ParameterCode));
        input.measurement_date = take(
            self.coerce_datetime(cell(ImportField::MeasurementDate)),
            ImportField::MeasurementDate,
            "Measurement date value is invalid.",
            &mut input.issues,
        );
        input.entry_date = take(
            self.coerce_datetime(cell(ImportField::EntryDate)),
            ImportField::EntryDate,
            "Entry date value is invalid.",
            &mut input.issues,
        );
        input.value = take(
            self.coerce_float(cell(ImportField::Value)),
            ImportField::Value,
            "Value is invalid.",
            &mut input.issues,
        );
        input.unit = self.coerce_string(cell(ImportField::Unit));
        input.remark = self.coerce_string(cell(ImportField::Remark));
        input.is_approved = take(
            self.coerce_bool(cell(ImportField::Approved)),
            ImportField::Approved,
            "Approval flag value is invalid.",
            &mut input.issues,
        );
        input.approved_at = take(
            self.coerce_datetime(cell(ImportField::ApprovedAt)),
            ImportField::ApprovedAt,
            "Approved at value is invalid.",
            &mut input.issues,
        );

        Some(input)
    }

}

// 解析失败时记录单元格错误
fn take<T>(
    outcome: CellOutcome<T>,
    field: ImportField,
    message: &str,
    issues: &mut Vec<CellIssue>,
) -> Option<T> {
    if outcome.is_invalid() {
        issues.push(CellIssue {
            field,
            message: message.to_string(),
        });
    }
    outcome.into_option()
}

// ==========================================
// 文本解析辅助函数
// ==========================================

fn round_to_i64(n: f64) -> Option<i64> {
    if !n.is_finite() {
        return None;
    }
    let rounded = n.round_ties_even();
    if rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
        return None;
    }
    Some(rounded as i64)
}

fn parse_integer_text(text: &str) -> Option<i64> {
    // i64::from_str 接受前导 '+'
    text.parse::<i64>().ok()
}

fn parse_bool_text(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("yes") {
        return Some(true);
    }
    if text.eq_ignore_ascii_case("false") || text.eq_ignore_ascii_case("no") {
        return Some(false);
    }
    parse_integer_text(text).map(|n| n != 0)
}

/// 按指定小数点/千分位解析数字
///
/// 千分位必须为规范三位分组（"1,234,567"）；允许科学计数法后缀。
///
/// 注意: 分组不规范的文本在固定格式下判为无法解析，交给本地格式处理。
/// 因此 "1,5" 得到 1.5（本地 ',' 小数点），而宽松的千分位解析会把它读成 15。
fn parse_grouped(text: &str, decimal: char, group: char) -> Option<f64> {
    if text.is_empty() || decimal == group {
        return None;
    }

    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(idx) => (&text[..idx], Some(&text[idx + 1..])),
        None => (text, None),
    };

    let (sign, unsigned) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa.strip_prefix('+').unwrap_or(mantissa)),
    };

    let (int_part, frac_part) = match unsigned.split_once(decimal) {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };

    let int_digits = strip_groups(int_part, group)?;
    if !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if int_digits.is_empty() && frac_part.is_empty() {
        return None;
    }

    let mut normalized = format!(
        "{}{}.{}",
        sign,
        if int_digits.is_empty() { "0" } else { &int_digits },
        if frac_part.is_empty() { "0" } else { frac_part }
    );

    if let Some(exp) = exponent {
        let exp_digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        if exp_digits.is_empty() || !exp_digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        normalized.push('e');
        normalized.push_str(exp);
    }

    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn strip_groups(int_part: &str, group: char) -> Option<String> {
    if !int_part.contains(group) {
        return int_part
            .chars()
            .all(|c| c.is_ascii_digit())
            .then(|| int_part.to_string());
    }

    let mut groups = int_part.split(group);
    let head = groups.next()?;
    if head.is_empty() || head.len() > 3 || !head.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut digits = head.to_string();
    for chunk in groups {
        if chunk.len() != 3 || !chunk.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.push_str(chunk);
    }
    Some(digits)
}

fn try_formats(
    text: &str,
    datetime_formats: &[&str],
    date_formats: &[&str],
) -> Option<NaiveDateTime> {
    datetime_formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            date_formats
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
