// ==========================================
// 上部完井管柱配管系统 - 排布引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 引擎错误均不可恢复，不返回部分结果
// ==========================================

use thiserror::Error;

/// 排布阶段（用于错误与日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanPass {
    Estimate, // 立柱粗算
    Detailed, // 详细排布
}

impl std::fmt::Display for PlanPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanPass::Estimate => write!(f, "estimate"),
            PlanPass::Detailed => write!(f, "detailed"),
        }
    }
}

/// 排布引擎错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    // ===== 约束评估 =====
    #[error("缺少套管接箍数据: 总成 {assembly_id} 需要校核关键点")]
    MissingCasingData { assembly_id: String },

    // ===== 排布失败 =====
    #[error("无可用管柱: 末端总成 {assembly_id} 放置后仍差 {shortfall:.3} m（容差 {tolerance} m）")]
    NoLegalPlacement {
        assembly_id: String,
        shortfall: f64,
        tolerance: f64,
    },

    #[error("迭代次数超限 ({pass}): 已执行 {limit} 次仍未完成排布")]
    IterationBudgetExceeded { pass: PlanPass, limit: usize },

    // ===== 输入校验 =====
    #[error("库存为空: 无法计算平均管长")]
    EmptyInventory,

    #[error("无效输入: {0}")]
    InvalidInput(String),

    // ===== 库存一致性 =====
    #[error("库存中找不到管柱: {0}")]
    InventoryItemNotFound(String),
}

/// Result 类型别名
pub type PlanResult<T> = Result<T, PlanError>;
