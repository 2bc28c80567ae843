// ==========================================
// 上部完井管柱配管系统 - 引擎编排器
// ==========================================
// 用途: 三步流程
// 步骤1: 按平均管长估算所需单根数
// 步骤2: 立柱粗算（两次，第二次以第一次误差校准目标长度）
// 步骤3: 详细排布（两次，每次使用全新的库存副本）
// ==========================================

use crate::config::PlanningSettings;
use crate::domain::assembly::ConstrainedAssembly;
use crate::domain::inventory::DeckTally;
use crate::domain::pipe::Segment;
use crate::domain::plan_state::PlanState;
use crate::engine::error::PlanResult;
use crate::engine::estimator::{required_pipe_count, StandEstimator};
use crate::engine::planner::CompletionPlanner;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ==========================================
// TallyInputs - 排布输入
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct TallyInputs {
    /// 甲板清单全部单根（粗算求平均管长）
    pub segments: Vec<Segment>,
    /// 甲板库存（每次详细排布克隆一份）
    pub deck: DeckTally,
    /// 总成序列（按下井顺序）
    pub assemblies: Vec<ConstrainedAssembly>,
    /// 套管接箍深度
    pub casing_joints: Vec<f64>,
}

// ==========================================
// PassOutcome - 两次运行结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassOutcome {
    /// 第一次运行的长度误差
    pub first_error: f64,
    /// 第二次运行使用的目标长度
    pub calibrated_goal: f64,
    /// 第二次运行结果
    pub state: PlanState,
}

impl PassOutcome {
    /// 相对原始目标的剩余误差
    pub fn residual_error(&self, goal: f64) -> f64 {
        goal - self.state.length()
    }
}

// ==========================================
// TallyOutcome - 三步流程结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyOutcome {
    pub goal: f64,
    pub required_pipes: u32,
    pub estimate: PassOutcome,
    pub plan: PassOutcome,
}

// ==========================================
// TallyOrchestrator - 引擎编排器
// ==========================================
pub struct TallyOrchestrator {
    settings: PlanningSettings,
    estimator: StandEstimator,
    planner: CompletionPlanner,
}

impl TallyOrchestrator {
    /// 创建编排器
    pub fn new(settings: PlanningSettings) -> Self {
        Self {
            planner: CompletionPlanner::new().with_terminal_tolerance(settings.terminal_tolerance),
            estimator: StandEstimator::new(),
            settings,
        }
    }

    /// 步骤1: 所需单根数
    pub fn required_pipes(&self, goal: f64) -> u32 {
        required_pipe_count(goal, self.settings.average_pipe_length)
    }

    /// 步骤2: 立柱粗算（两次）
    pub fn estimate_stands(&self, goal: f64, inputs: &TallyInputs) -> PlanResult<PassOutcome> {
        let assemblies = self.prepared_assemblies(&inputs.assemblies);
        two_pass(goal, |target| {
            self.estimator
                .estimate(target, &inputs.segments, &assemblies, &inputs.casing_joints)
        })
    }

    /// 步骤3: 详细排布（两次，每次使用新的库存副本）
    pub fn plan_completion(&self, goal: f64, inputs: &TallyInputs) -> PlanResult<PassOutcome> {
        let assemblies = self.prepared_assemblies(&inputs.assemblies);
        two_pass(goal, |target| {
            self.planner
                .plan(target, inputs.deck.clone(), &assemblies, &inputs.casing_joints)
        })
    }

    /// 执行三步流程
    pub fn run(&self, goal: f64, inputs: &TallyInputs) -> PlanResult<TallyOutcome> {
        info!(
            goal,
            segments_count = inputs.segments.len(),
            deck_remaining = inputs.deck.remaining(),
            assemblies_count = inputs.assemblies.len(),
            "开始执行配管流程"
        );

        let required_pipes = self.required_pipes(goal);
        debug!(required_pipes, "步骤1: 所需单根数");

        let estimate = self.estimate_stands(goal, inputs)?;
        debug!(
            triples = estimate.state.tally().triples,
            doubles = estimate.state.tally().doubles,
            singles = estimate.state.tally().singles,
            "步骤2: 立柱需求"
        );

        let plan = self.plan_completion(goal, inputs)?;
        info!(
            status = %plan.state.status(),
            residual_error = plan.residual_error(goal),
            "配管流程完成"
        );

        Ok(TallyOutcome {
            goal,
            required_pipes,
            estimate,
            plan,
        })
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 总成副本，统一使用配置中的关键点余量
    fn prepared_assemblies(&self, assemblies: &[ConstrainedAssembly]) -> Vec<ConstrainedAssembly> {
        assemblies
            .iter()
            .cloned()
            .map(|a| a.with_critical_margin(self.settings.critical_margin))
            .collect()
    }
}

impl Default for TallyOrchestrator {
    fn default() -> Self {
        Self::new(PlanningSettings::default())
    }
}

/// 运行两次：第二次目标长度 = goal - 第一次误差
fn two_pass<F>(goal: f64, run: F) -> PlanResult<PassOutcome>
where
    F: Fn(f64) -> PlanResult<PlanState>,
{
    let first = run(goal)?;
    let first_error = first.length_error();
    let calibrated_goal = goal - first_error;
    debug!(first_error, calibrated_goal, "以第一次误差校准目标长度");

    let state = run(calibrated_goal)?;
    Ok(PassOutcome {
        first_error,
        calibrated_goal,
        state,
    })
}
