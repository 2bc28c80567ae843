// ==========================================
// 上部完井管柱配管系统 - 领域模型层
// ==========================================
// 职责: 管柱、立柱、总成、库存容器与排布状态
// 红线: 不含文件读取逻辑，不含排布决策逻辑
// ==========================================

pub mod assembly;
pub mod inventory;
pub mod pipe;
pub mod plan_state;
pub mod types;

// 重导出核心类型
pub use assembly::{AssemblyRecord, ConstrainedAssembly, ConstraintClears};
pub use inventory::{Candidate, DeckTally, Inventory, SegmentPool, StandStack};
pub use pipe::{Joint, Segment, Stand};
pub use plan_state::{DepthEntry, PlanState, TallyItem};
pub use types::{round_length, PlanStatus, RackKind, UnitTally};
