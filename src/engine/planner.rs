// ==========================================
// 上部完井管柱配管系统 - 详细排布引擎
// ==========================================
// 职责: 以真实库存（立柱架 + 单根/短节堆）贪心排布管柱与总成
// 输入: 目标长度 + DeckTally + 总成序列 + 套管接箍深度
// 输出: PlanState（序列、分类计数、剩余库存）
// ==========================================
// 红线: 每根管柱只能从其来源容器精确取出一次
// 红线: 总成按给定顺序放置，末端总成最后放置
// 红线: 迭代上限 = floor(goal / 10)，超限即失败
// ==========================================

use crate::domain::assembly::ConstrainedAssembly;
use crate::domain::inventory::{Candidate, DeckTally};
use crate::domain::plan_state::PlanState;
use crate::domain::types::{round_length, PlanStatus};
use crate::engine::constraint::ConstraintCheck;
use crate::engine::error::{PlanError, PlanPass, PlanResult};
use crate::perf::PerfGuard;
use std::collections::VecDeque;
use tracing::{debug, info, instrument, warn};

/// 末端总成放置后允许的长度不足 (m)
pub const DEFAULT_TERMINAL_TOLERANCE: f64 = 5.0;

/// 迭代上限步长 (m)：每 10 m 目标长度允许一次迭代
const ITERATION_STEP: f64 = 10.0;

/// 输入校验
///
/// - 目标长度必须为正的有限数
/// - 末端总成最多一个，且必须位于序列末尾
pub fn validate_inputs(goal: f64, assemblies: &[ConstrainedAssembly]) -> PlanResult<()> {
    if !goal.is_finite() || goal <= 0.0 {
        return Err(PlanError::InvalidInput(format!("目标长度无效: {goal}")));
    }

    let terminals: Vec<usize> = assemblies
        .iter()
        .enumerate()
        .filter(|(_, a)| a.terminal)
        .map(|(i, _)| i)
        .collect();

    match terminals.as_slice() {
        [] => Ok(()),
        [index] if *index + 1 == assemblies.len() => Ok(()),
        [index] => Err(PlanError::InvalidInput(format!(
            "末端总成 {} 必须位于序列末尾",
            assemblies[*index].id
        ))),
        _ => Err(PlanError::InvalidInput(format!(
            "末端总成只能有一个，实际 {} 个",
            terminals.len()
        ))),
    }
}

// ==========================================
// CompletionPlanner - 详细排布引擎
// ==========================================
pub struct CompletionPlanner {
    terminal_tolerance: f64,
}

impl CompletionPlanner {
    pub fn new() -> Self {
        Self {
            terminal_tolerance: DEFAULT_TERMINAL_TOLERANCE,
        }
    }

    pub fn with_terminal_tolerance(mut self, tolerance: f64) -> Self {
        self.terminal_tolerance = tolerance;
        self
    }

    pub fn terminal_tolerance(&self) -> f64 {
        self.terminal_tolerance
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 详细排布
    ///
    /// 每次迭代至多放置一项（总成或管柱）:
    /// 1) 末端总成: 放置不超目标的最长管柱；无可放管柱时放置末端总成并校核长度不足
    /// 2) 普通总成已放行: 放置总成
    /// 3) 普通总成未放行: 放置能使其放行的最短管柱（不含短节）
    /// 4) 否则: 放置最长管柱（含短节），超出目标则提前终止 (Stalled)
    ///
    /// # 参数
    /// - `goal`: 目标长度 (m)
    /// - `deck`: 本次调用独占的甲板库存
    /// - `assemblies`: 总成序列（按下井顺序）
    /// - `casing_joints`: 套管接箍深度
    #[instrument(skip(self, deck, assemblies, casing_joints), fields(
        deck_remaining = deck.remaining(),
        assemblies_count = assemblies.len()
    ))]
    pub fn plan(
        &self,
        goal: f64,
        mut deck: DeckTally,
        assemblies: &[ConstrainedAssembly],
        casing_joints: &[f64],
    ) -> PlanResult<PlanState> {
        validate_inputs(goal, assemblies)?;

        let mut state = PlanState::new(goal).with_casing_joints(casing_joints.to_vec());
        let mut queue: VecDeque<ConstrainedAssembly> = assemblies.iter().cloned().collect();
        let mut active: Option<ConstrainedAssembly> = None;
        let max_iterations = (goal / ITERATION_STEP).floor() as usize;
        let mut perf = PerfGuard::new("plan_completion");

        info!(goal, max_iterations, "开始详细排布");

        for _ in 0..max_iterations {
            if state.is_done() {
                break;
            }
            perf.iteration();
            let placed_before = state.solution().len();

            if active.is_none() {
                active = queue.pop_front();
                if let Some(assembly) = active.as_mut() {
                    assembly.refresh_against_plan(&state)?;
                }
            }

            match active.take() {
                Some(assembly) if assembly.terminal => {
                    active = self.step_terminal(&mut state, &mut deck, assembly)?;
                }
                Some(assembly) if assembly.is_available() => {
                    debug!(assembly_id = %assembly.id, length = state.length(), "放置总成");
                    state.place_assembly(assembly);
                }
                Some(mut assembly) => {
                    self.step_toward(&mut state, &mut deck, &assembly)?;
                    if !state.is_done() {
                        assembly.refresh_against_plan(&state)?;
                    }
                    active = Some(assembly);
                }
                None => self.step_fallback(&mut state, &mut deck, None)?,
            }

            if state.solution().len() > placed_before {
                perf.placement();
            }
        }

        if !state.is_done() {
            return Err(PlanError::IterationBudgetExceeded {
                pass: PlanPass::Detailed,
                limit: max_iterations,
            });
        }

        state.set_leftover(deck);

        info!(
            status = %state.status(),
            length = state.length(),
            length_error = state.length_error(),
            triples = state.tally().triples,
            doubles = state.tally().doubles,
            singles = state.tally().singles,
            pups = state.tally().pups,
            "详细排布完成"
        );

        Ok(state)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 末端总成分支
    ///
    /// 返回仍需保留的末端总成（已放置时返回 None）
    fn step_terminal(
        &self,
        state: &mut PlanState,
        deck: &mut DeckTally,
        terminal: ConstrainedAssembly,
    ) -> PlanResult<Option<ConstrainedAssembly>> {
        let longest = deck
            .available_sorted(true)
            .into_iter()
            .filter(|c| {
                round_length(state.length() + terminal.length + c.joint.length()) <= state.goal
            })
            .last();

        if let Some(candidate) = longest {
            take_and_place(state, deck, &candidate)?;
            return Ok(Some(terminal));
        }

        let assembly_id = terminal.id.clone();
        debug!(assembly_id = %assembly_id, length = state.length(), "放置末端总成");
        state.place_assembly(terminal);

        let shortfall = round_length(state.goal - state.length());
        if shortfall < self.terminal_tolerance {
            state.finish(PlanStatus::Completed);
            Ok(None)
        } else {
            Err(PlanError::NoLegalPlacement {
                assembly_id,
                shortfall,
                tolerance: self.terminal_tolerance,
            })
        }
    }

    /// 普通总成未放行：寻找能使其放行的最短管柱
    fn step_toward(
        &self,
        state: &mut PlanState,
        deck: &mut DeckTally,
        assembly: &ConstrainedAssembly,
    ) -> PlanResult<()> {
        for candidate in deck.available_sorted(false) {
            if assembly.would_clear_with(state, &candidate.joint)? {
                debug!(
                    assembly_id = %assembly.id,
                    joint_id = candidate.joint.id(),
                    "放置使总成放行的最短管柱"
                );
                return take_and_place(state, deck, &candidate);
            }
        }
        self.step_fallback(state, deck, Some(assembly))
    }

    /// 兜底：放置最长管柱（含短节），超出目标则提前终止
    ///
    /// 库存用尽时，仍有待放置总成 (`pending`) 则不结束排布，由迭代上限报错
    fn step_fallback(
        &self,
        state: &mut PlanState,
        deck: &mut DeckTally,
        pending: Option<&ConstrainedAssembly>,
    ) -> PlanResult<()> {
        match deck.available_sorted(true).pop() {
            Some(candidate) if round_length(state.length() + candidate.joint.length()) <= state.goal => {
                take_and_place(state, deck, &candidate)
            }
            Some(candidate) => {
                warn!(
                    joint_id = candidate.joint.id(),
                    length = state.length(),
                    goal = state.goal,
                    "最长管柱将超出目标长度，排布提前终止"
                );
                state.finish(PlanStatus::Stalled);
                Ok(())
            }
            None => {
                if let Some(assembly) = pending {
                    debug!(assembly_id = %assembly.id, length = state.length(), "甲板库存已用尽，总成无法放行");
                    return Ok(());
                }
                warn!(length = state.length(), goal = state.goal, "甲板库存已用尽，排布提前终止");
                state.finish(PlanStatus::Stalled);
                Ok(())
            }
        }
    }
}

/// 从来源容器取出并放置
fn take_and_place(
    state: &mut PlanState,
    deck: &mut DeckTally,
    candidate: &Candidate,
) -> PlanResult<()> {
    let joint = deck
        .take(candidate)
        .ok_or_else(|| PlanError::InventoryItemNotFound(candidate.joint.id().to_string()))?;
    debug!(joint_id = joint.id(), origin = %candidate.origin, "放置管柱");
    state.place_segment(joint);
    Ok(())
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for CompletionPlanner {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pipe::Segment;

    fn singles(lengths: &[f64]) -> DeckTally {
        let segments = lengths
            .iter()
            .enumerate()
            .map(|(i, l)| Segment::new(format!("S{i}"), *l))
            .collect();
        DeckTally::new(vec![], vec![], segments, vec![])
    }

    #[test]
    fn test_validate_inputs() {
        let hanger = ConstrainedAssembly::new("hanger", 1.0).terminal();
        let packer = ConstrainedAssembly::new("packer", 2.0);

        assert!(validate_inputs(100.0, &[packer.clone(), hanger.clone()]).is_ok());
        assert!(validate_inputs(100.0, &[]).is_ok());
        assert!(matches!(
            validate_inputs(0.0, &[]),
            Err(PlanError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_inputs(100.0, &[hanger.clone(), packer]),
            Err(PlanError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_inputs(100.0, &[hanger.clone(), hanger]),
            Err(PlanError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_terminal_picks_longest_fitting() {
        // 85 + 4 + 10 = 99 <= 100；6 会超出
        let planner = CompletionPlanner::new();
        let deck = singles(&[3.0, 4.0, 6.0, 85.0]);
        let hanger = ConstrainedAssembly::new("hanger", 10.0).terminal();

        let state = planner.plan(100.0, deck, &[hanger], &[]).unwrap();

        let ids: Vec<&str> = state.solution().iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["S3", "S1", "hanger"]);
        assert_eq!(state.length(), 99.0);
        assert_eq!(state.status(), PlanStatus::Completed);

        let leftover = state.leftover().unwrap();
        assert_eq!(leftover.remaining(), 2);
    }

    #[test]
    fn test_terminal_shortfall_fails() {
        let planner = CompletionPlanner::new();
        let deck = singles(&[50.0, 50.0]);
        let hanger = ConstrainedAssembly::new("hanger", 10.0).terminal();

        let err = planner.plan(100.0, deck, &[hanger], &[]).unwrap_err();
        match err {
            PlanError::NoLegalPlacement {
                assembly_id,
                shortfall,
                ..
            } => {
                assert_eq!(assembly_id, "hanger");
                assert_eq!(shortfall, 40.0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_overshoot_stalls() {
        let planner = CompletionPlanner::new();
        let deck = singles(&[60.0, 60.0]);

        let state = planner.plan(100.0, deck, &[], &[]).unwrap();
        assert_eq!(state.status(), PlanStatus::Stalled);
        assert_eq!(state.length(), 60.0);
        assert_eq!(state.leftover().map(|d| d.remaining()), Some(1));
    }

    #[test]
    fn test_empty_deck_stalls() {
        let planner = CompletionPlanner::new();
        let state = planner.plan(100.0, DeckTally::default(), &[], &[]).unwrap();
        assert_eq!(state.status(), PlanStatus::Stalled);
        assert!(state.solution().is_empty());
    }

    #[test]
    fn test_iteration_budget() {
        // goal 30 → 上限 3 次迭代；间隔根数永远无法满足
        let planner = CompletionPlanner::new();
        let deck = singles(&[1.0, 1.0, 1.0, 1.0, 1.0]);
        let packer = ConstrainedAssembly::new("packer", 1.0).with_separation_count(100);

        let err = planner.plan(30.0, deck, &[packer], &[]).unwrap_err();
        assert_eq!(
            err,
            PlanError::IterationBudgetExceeded {
                pass: PlanPass::Detailed,
                limit: 3
            }
        );
    }
}
