// ==========================================
// 上部完井管柱配管系统 - 引擎层
// ==========================================
// 职责: 约束评估、立柱粗算、详细排布与三步流程编排
// 红线: 单线程、同步、确定性；每次调用独占自己的状态与库存
// ==========================================

pub mod constraint;
pub mod error;
pub mod estimator;
pub mod orchestrator;
pub mod planner;

// 重导出核心引擎
pub use constraint::{Constraint, ConstraintCheck, PlanView};
pub use error::{PlanError, PlanPass, PlanResult};
pub use estimator::{mean_length, required_pipe_count, StandEstimator};
pub use orchestrator::{PassOutcome, TallyInputs, TallyOrchestrator, TallyOutcome};
pub use planner::{validate_inputs, CompletionPlanner};
