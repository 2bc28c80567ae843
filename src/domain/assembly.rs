// ==========================================
// 上部完井管柱配管系统 - 工具总成领域模型
// ==========================================
// 职责: 带放置约束的工具总成（封隔器、井下安全阀、油管挂等）
// 红线: 总成顺序由调用方给定，排布引擎不得调整
// ==========================================
// 约束（均可选，缺省即视为满足）:
// - 下限深度 / 上限深度
// - 距上一总成的间隔长度 / 间隔根数
// - 关键点避开套管接箍（默认余量 1.5 m）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 关键点默认避让余量 (m)
pub const DEFAULT_CRITICAL_MARGIN: f64 = 1.5;

// ==========================================
// AssemblyRecord - 总成输入记录（8 字段）
// ==========================================
// 字段顺序: id, 长度, 下限, 上限, 是否末端总成, 间隔长度, 间隔根数, 关键点偏移
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyRecord {
    pub id: String,
    pub length: f64,
    #[serde(default)]
    pub lower_limit: Option<f64>,
    #[serde(default)]
    pub upper_limit: Option<f64>,
    #[serde(default)]
    pub is_terminal: bool,
    #[serde(default)]
    pub separation_length: Option<f64>,
    #[serde(default)]
    pub separation_count: Option<u32>,
    #[serde(default)]
    pub critical_point_offset: Option<f64>,
}

// ==========================================
// ConstraintClears - 五项约束的放行标志
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintClears {
    pub lower_limit: bool,
    pub upper_limit: bool,
    pub separation_length: bool,
    pub separation_count: bool,
    pub critical_point: bool,
}

impl ConstraintClears {
    /// 全部放行
    pub fn all_clear(&self) -> bool {
        self.lower_limit
            && self.upper_limit
            && self.separation_length
            && self.separation_count
            && self.critical_point
    }
}

// ==========================================
// ConstrainedAssembly - 约束总成
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstrainedAssembly {
    pub id: String,
    pub length: f64,

    // ===== 约束参数 =====
    pub lower_limit: Option<f64>,           // 下限深度 (m)
    pub upper_limit: Option<f64>,           // 上限深度 (m)
    pub separation_length: Option<f64>,     // 距上一总成最小长度 (m)
    pub separation_count: Option<u32>,      // 距上一总成最少根数
    pub critical_point_offset: Option<f64>, // 关键点距总成底端 (m)
    pub critical_margin: f64,               // 关键点避让余量 (m)

    // ===== 末端总成（油管挂）=====
    pub terminal: bool,

    // ===== 放行标志（由约束刷新写入）=====
    pub clears: ConstraintClears,
}

impl ConstrainedAssembly {
    /// 创建无约束总成
    pub fn new(id: impl Into<String>, length: f64) -> Self {
        Self {
            id: id.into(),
            length,
            lower_limit: None,
            upper_limit: None,
            separation_length: None,
            separation_count: None,
            critical_point_offset: None,
            critical_margin: DEFAULT_CRITICAL_MARGIN,
            terminal: false,
            clears: ConstraintClears {
                lower_limit: true,
                upper_limit: true,
                separation_length: true,
                separation_count: true,
                critical_point: true,
            },
        }
    }

    pub fn with_lower_limit(mut self, depth: f64) -> Self {
        self.lower_limit = Some(depth);
        self.reset_clears();
        self
    }

    pub fn with_upper_limit(mut self, depth: f64) -> Self {
        self.upper_limit = Some(depth);
        self.reset_clears();
        self
    }

    pub fn with_separation_length(mut self, distance: f64) -> Self {
        self.separation_length = Some(distance);
        self.reset_clears();
        self
    }

    pub fn with_separation_count(mut self, count: u32) -> Self {
        self.separation_count = Some(count);
        self.reset_clears();
        self
    }

    pub fn with_critical_point(mut self, offset: f64) -> Self {
        self.critical_point_offset = Some(offset);
        self.reset_clears();
        self
    }

    pub fn with_critical_margin(mut self, margin: f64) -> Self {
        self.critical_margin = margin;
        self
    }

    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    /// 放行标志初始值
    ///
    /// 已设置的约束初始为未放行；上限约束自下而上排布，初始即放行。
    fn reset_clears(&mut self) {
        self.clears = ConstraintClears {
            lower_limit: self.lower_limit.is_none(),
            upper_limit: true,
            separation_length: self.separation_length.is_none(),
            separation_count: self.separation_count.is_none(),
            critical_point: self.critical_point_offset.is_none(),
        };
    }

    /// 当前放行标志是否全部满足
    pub fn is_available(&self) -> bool {
        self.clears.all_clear()
    }
}

/// 数值为 0 的约束参数视为未设置
fn non_zero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

impl From<AssemblyRecord> for ConstrainedAssembly {
    fn from(record: AssemblyRecord) -> Self {
        let mut assembly = ConstrainedAssembly::new(record.id, record.length);
        assembly.lower_limit = non_zero(record.lower_limit);
        assembly.upper_limit = non_zero(record.upper_limit);
        assembly.separation_length = non_zero(record.separation_length);
        assembly.separation_count = record.separation_count.filter(|n| *n != 0);
        assembly.critical_point_offset = non_zero(record.critical_point_offset);
        assembly.terminal = record.is_terminal;
        assembly.reset_clears();
        assembly
    }
}

impl fmt::Display for ConstrainedAssembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
