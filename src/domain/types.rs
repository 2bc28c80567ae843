// ==========================================
// 上部完井管柱配管系统 - 领域类型定义
// ==========================================
// 红线: 长度统一保留 3 位小数（定点策略，每次累加后取整）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 长度小数位数
pub const LENGTH_DECIMALS: i32 = 3;

/// 长度取整（3 位小数）
///
/// 每次累加后都必须调用，避免数百次累加后的浮点漂移。
pub fn round_length(value: f64) -> f64 {
    round_to(value, LENGTH_DECIMALS)
}

/// 按指定小数位取整
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ==========================================
// 料架类型 (Rack Kind)
// ==========================================
// 三联/双联立柱放在架上（后进先出），单根与短节堆放（全部可取）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RackKind {
    Triples, // 三联立柱架
    Doubles, // 双联立柱架
    Singles, // 单根堆
    Pups,    // 短节堆
}

impl RackKind {
    /// 按单元数与短节标志归类
    ///
    /// 单元数不是 1/2/3 时返回 None（不计入任何类别）
    pub fn classify(unit_count: u32, pup: bool) -> Option<Self> {
        match (unit_count, pup) {
            (3, _) => Some(RackKind::Triples),
            (2, _) => Some(RackKind::Doubles),
            (1, false) => Some(RackKind::Singles),
            (1, true) => Some(RackKind::Pups),
            _ => None,
        }
    }
}

impl fmt::Display for RackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RackKind::Triples => write!(f, "triple stands"),
            RackKind::Doubles => write!(f, "double stands"),
            RackKind::Singles => write!(f, "single pipes"),
            RackKind::Pups => write!(f, "pups"),
        }
    }
}

// ==========================================
// 排布状态 (Plan Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    InProgress, // 排布中
    Completed,  // 已完成
    Stalled,    // 提前终止：最长可用管柱也会超出目标
}

impl PlanStatus {
    pub fn is_done(&self) -> bool {
        !matches!(self, PlanStatus::InProgress)
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanStatus::InProgress => write!(f, "IN_PROGRESS"),
            PlanStatus::Completed => write!(f, "COMPLETED"),
            PlanStatus::Stalled => write!(f, "STALLED"),
        }
    }
}

// ==========================================
// UnitTally - 分类计数
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTally {
    pub triples: u32,
    pub doubles: u32,
    pub singles: u32,
    pub pups: u32,
    pub assemblies: u32,
}

impl UnitTally {
    /// 计入一个管柱
    pub fn record(&mut self, kind: RackKind) {
        match kind {
            RackKind::Triples => self.triples += 1,
            RackKind::Doubles => self.doubles += 1,
            RackKind::Singles => self.singles += 1,
            RackKind::Pups => self.pups += 1,
        }
    }

    /// 将一段连续单根数按贪心拆分为三联/双联/单根
    ///
    /// 8 根 → 2 三联 + 1 双联 + 0 单根
    pub fn add_run(&mut self, run_units: u32) {
        let mut rest = run_units;
        self.triples += rest / 3;
        rest %= 3;
        self.doubles += rest / 2;
        rest %= 2;
        self.singles += rest;
    }
}

impl fmt::Display for UnitTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "triples={}, doubles={}, singles={}, pups={}, assemblies={}",
            self.triples, self.doubles, self.singles, self.pups, self.assemblies
        )
    }
}
