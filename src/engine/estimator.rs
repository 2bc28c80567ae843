// ==========================================
// 上部完井管柱配管系统 - 立柱粗算引擎
// ==========================================
// 职责: 以平均管长占位，估算需要预先组装的三联/双联/单根数量
// 输入: 甲板单根清单 + 总成序列 + 套管接箍深度
// 输出: PlanState（分类计数 = 立柱需求，长度误差供第二次校准）
// ==========================================
// 红线: 只消耗占位管柱，不得触碰真实库存容器
// 红线: 迭代上限 = 单根数 + 总成数，超限即失败
// ==========================================

use crate::domain::assembly::ConstrainedAssembly;
use crate::domain::pipe::{Joint, Segment};
use crate::domain::plan_state::PlanState;
use crate::domain::types::{round_length, PlanStatus};
use crate::engine::constraint::ConstraintCheck;
use crate::engine::error::{PlanError, PlanPass, PlanResult};
use crate::engine::planner::validate_inputs;
use crate::perf::PerfGuard;
use tracing::{debug, info, instrument};

/// 平均管长（3 位小数）
pub fn mean_length(segments: &[Segment]) -> PlanResult<f64> {
    if segments.is_empty() {
        return Err(PlanError::EmptyInventory);
    }
    let total: f64 = segments.iter().map(|s| s.length).sum();
    Ok(round_length(total / segments.len() as f64))
}

/// 步骤1：按平均管长估算所需单根数
pub fn required_pipe_count(goal: f64, average_length: f64) -> u32 {
    if average_length <= 0.0 || goal <= 0.0 {
        return 0;
    }
    (goal / average_length).floor() as u32
}

// ==========================================
// StandEstimator - 立柱粗算引擎
// ==========================================
pub struct StandEstimator {
    // 无状态引擎
}

impl StandEstimator {
    pub fn new() -> Self {
        Self {}
    }

    /// 粗算立柱需求
    ///
    /// # 参数
    /// - `goal`: 目标长度 (m)
    /// - `segments`: 甲板单根清单（仅用于求平均管长与迭代上限）
    /// - `assemblies`: 总成序列（按下井顺序）
    /// - `casing_joints`: 套管接箍深度
    ///
    /// # 返回
    /// 完成的 PlanState，其分类计数为立柱需求
    #[instrument(skip(self, segments, assemblies, casing_joints), fields(
        segments_count = segments.len(),
        assemblies_count = assemblies.len()
    ))]
    pub fn estimate(
        &self,
        goal: f64,
        segments: &[Segment],
        assemblies: &[ConstrainedAssembly],
        casing_joints: &[f64],
    ) -> PlanResult<PlanState> {
        validate_inputs(goal, assemblies)?;
        let average = mean_length(segments)?;
        let placeholder = Segment::new(format!("{average:.3}"), average);

        let mut state = PlanState::new(goal).with_casing_joints(casing_joints.to_vec());
        let mut assemblies = assemblies.to_vec();
        let mut assembly_index = 0;
        let max_iterations = segments.len() + assemblies.len();
        let mut perf = PerfGuard::new("estimate_stands");

        info!(goal, average_length = average, max_iterations, "开始立柱粗算");

        for _ in 0..max_iterations {
            if state.is_done() {
                break;
            }
            perf.iteration();

            let mut place_placeholder = true;
            if let Some(assembly) = assemblies.get_mut(assembly_index) {
                assembly.refresh_against_plan(&state)?;

                if assembly.terminal {
                    // 再下一根占位即超出目标：放置末端总成并结束
                    if round_length(state.length() + average + assembly.length) > goal {
                        debug!(assembly_id = %assembly.id, length = state.length(), "放置末端总成");
                        state.place_assembly(assembly.clone());
                        state.finish(PlanStatus::Completed);
                        assembly_index += 1;
                        place_placeholder = false;
                        perf.placement();
                    }
                } else if assembly.is_available() {
                    debug!(assembly_id = %assembly.id, length = state.length(), "放置总成");
                    state.place_assembly(assembly.clone());
                    assembly_index += 1;
                    place_placeholder = false;
                    perf.placement();
                }
            }

            if place_placeholder {
                if round_length(state.length() + average) <= goal {
                    state.place_segment(Joint::Single(placeholder.clone()));
                    perf.placement();
                } else {
                    state.finish(PlanStatus::Completed);
                }
            }
        }

        if !state.is_done() {
            return Err(PlanError::IterationBudgetExceeded {
                pass: PlanPass::Estimate,
                limit: max_iterations,
            });
        }

        state.convert_gaps_to_stands();

        info!(
            length = state.length(),
            length_error = state.length_error(),
            triples = state.tally().triples,
            doubles = state.tally().doubles,
            singles = state.tally().singles,
            "立柱粗算完成"
        );

        Ok(state)
    }
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for StandEstimator {
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

    fn segments(count: usize) -> Vec<Segment> {
        (0..count)
            .map(|i| Segment::new(format!("P{i}"), if i % 2 == 0 { 9.0 } else { 11.0 }))
            .collect()
    }

    #[test]
    fn test_mean_length() {
        assert_eq!(mean_length(&segments(4)).unwrap(), 10.0);
        assert_eq!(mean_length(&[]).unwrap_err(), PlanError::EmptyInventory);
    }

    #[test]
    fn test_required_pipe_count() {
        assert_eq!(required_pipe_count(2247.0, 11.5), 195);
        assert_eq!(required_pipe_count(100.0, 12.0), 8);
        assert_eq!(required_pipe_count(0.0, 11.5), 0);
    }

    #[test]
    fn test_estimate_without_assemblies_fills_to_goal() {
        let estimator = StandEstimator::new();
        let state = estimator.estimate(95.0, &segments(10), &[], &[]).unwrap();

        // 9 根占位 = 90 m，第 10 根会超出
        assert_eq!(state.length(), 90.0);
        assert_eq!(state.length_error(), 5.0);
        assert_eq!(state.tally().triples, 3);
        assert_eq!(state.tally().doubles, 0);
        assert_eq!(state.tally().singles, 0);
    }

    #[test]
    fn test_estimate_with_separation_and_terminal() {
        let estimator = StandEstimator::new();
        let assemblies = vec![
            ConstrainedAssembly::new("packer", 5.0).with_separation_count(3),
            ConstrainedAssembly::new("hanger", 2.0).terminal(),
        ];
        let state = estimator
            .estimate(100.0, &segments(10), &assemblies, &[])
            .unwrap();

        assert_eq!(state.length(), 97.0);
        assert_eq!(state.gap_history(), &[3, 6]);
        assert_eq!(state.tally().triples, 3);
        assert_eq!(state.tally().assemblies, 2);
        assert_eq!(state.solution().last().map(|i| i.id()), Some("hanger"));
    }

    #[test]
    fn test_placeholder_fit_uses_rounded_length() {
        let estimator = StandEstimator::new();
        let segments: Vec<Segment> = (0..10).map(|i| Segment::new(format!("P{i}"), 0.1)).collect();

        // 0.2 + 0.1 取整后恰为 0.3，第 3 根占位不超出
        let state = estimator.estimate(0.3, &segments, &[], &[]).unwrap();

        assert_eq!(state.length(), 0.3);
        assert_eq!(state.length_error(), 0.0);
        assert_eq!(state.tally().triples, 1);
    }

    #[test]
    fn test_estimate_iteration_budget() {
        let estimator = StandEstimator::new();
        let assemblies = vec![ConstrainedAssembly::new("dhsv", 3.0).with_separation_count(1000)];
        let err = estimator
            .estimate(10_000.0, &segments(5), &assemblies, &[])
            .unwrap_err();
        assert_eq!(
            err,
            PlanError::IterationBudgetExceeded {
                pass: PlanPass::Estimate,
                limit: 6
            }
        );
    }

    #[test]
    fn test_estimate_rejects_empty_inventory() {
        let estimator = StandEstimator::new();
        let err = estimator.estimate(100.0, &[], &[], &[]).unwrap_err();
        assert_eq!(err, PlanError::EmptyInventory);
    }
}
