// ==========================================
// 上部完井管柱配管系统 - 核心库
// ==========================================
// 系统定位: 按目标深度排布管柱与工具总成，给出立柱备料与深度表
// 流程: 所需单根数 → 立柱粗算（两次）→ 详细排布（两次）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 管柱、总成、库存、排布状态
pub mod domain;

// 引擎层 - 约束评估与排布
pub mod engine;

// 导入层 - 外部表格
pub mod importer;

// 配置层 - 排布参数与导入布局
pub mod config;

// 日志系统
pub mod logging;

// 性能统计
pub mod perf;

// 结果报告
pub mod report;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{
    ConstrainedAssembly, DeckTally, DepthEntry, Joint, PlanState, PlanStatus, RackKind, Segment,
    Stand, TallyItem, UnitTally,
};

// 引擎
pub use engine::{
    CompletionPlanner, PlanError, PlanResult, StandEstimator, TallyInputs, TallyOrchestrator,
    TallyOutcome,
};

// 导入与配置
pub use config::TallyConfig;
pub use importer::{ImportError, TallyImporter};
pub use report::TallyReport;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "上部完井管柱配管系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
