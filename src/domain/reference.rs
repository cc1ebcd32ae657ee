// ==========================================
// 环境监测系统 - 参考主数据领域模型
// ==========================================
// 职责: 排放源 / 监测参数的只读快照
// 红线: 导入核心只读取参考数据，绝不修改
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ==========================================
// ReferenceSite - 排放源（监测点）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSite {
    pub id: i64,
    pub name: String,
}

// ==========================================
// ParameterCategory - 参数类别
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterCategory {
    Air,
    #[default]
    Water,
}

impl ParameterCategory {
    /// 标准化类别文本
    ///
    /// 空值或无法识别的值统一归为 water
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()) {
            Some(ref s) if s == "air" => ParameterCategory::Air,
            _ => ParameterCategory::Water,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterCategory::Air => "air",
            ParameterCategory::Water => "water",
        }
    }
}

impl fmt::Display for ParameterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// ReferenceParameter - 监测参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceParameter {
    pub code: String, // 大写标准化后的参数代码
    pub name: String,
    pub unit: Option<String>,
    pub category: ParameterCategory,
}

impl ReferenceParameter {
    pub fn new(code: &str, name: &str, unit: Option<&str>, category: Option<&str>) -> Self {
        Self {
            code: normalize_parameter_code(code),
            name: name.to_string(),
            unit: unit
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            category: ParameterCategory::normalize(category),
        }
    }
}

/// 参数代码标准化（TRIM + UPPER）
pub fn normalize_parameter_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

// ==========================================
// CatalogSnapshot - 参考数据快照
// ==========================================
// 用途: 单次 Preview / Confirm 内的 O(1) 查找
// 约束: 每次调用重新获取，不跨调用共享
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    sites: HashMap<i64, String>,
    parameters: HashMap<String, ReferenceParameter>,
}

impl CatalogSnapshot {
    pub fn new(sites: Vec<ReferenceSite>, parameters: Vec<ReferenceParameter>) -> Self {
        let sites = sites.into_iter().map(|s| (s.id, s.name)).collect();
        let parameters = parameters
            .into_iter()
            .map(|mut p| {
                p.code = normalize_parameter_code(&p.code);
                (p.code.clone(), p)
            })
            .collect();

        Self { sites, parameters }
    }

    pub fn site_name(&self, site_id: i64) -> Option<&str> {
        self.sites.get(&site_id).map(String::as_str)
    }

    pub fn contains_site(&self, site_id: i64) -> bool {
        self.sites.contains_key(&site_id)
    }

    /// 按已标准化的参数代码查找
    pub fn parameter(&self, code: &str) -> Option<&ReferenceParameter> {
        self.parameters.get(code)
    }

    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }
}
