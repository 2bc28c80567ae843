// ==========================================
// StandEstimator 引擎集成测试
// ==========================================
// 测试目标: 验证立柱粗算逻辑
// 覆盖范围: 平均管长占位、总成约束、间隔拆分、迭代上限
// ==========================================

use completion_tally::domain::{ConstrainedAssembly, Segment};
use completion_tally::engine::{required_pipe_count, PlanError, PlanPass, StandEstimator};

// ==========================================
// 测试辅助函数
// ==========================================

/// 创建甲板清单（长度循环取值）
fn deck_tally(count: usize, lengths: &[f64]) -> Vec<Segment> {
    (0..count)
        .map(|i| Segment::new((i + 1).to_string(), lengths[i % lengths.len()]))
        .collect()
}

// ==========================================
// 步骤1
// ==========================================

#[test]
fn test_required_pipe_count_default_average() {
    assert_eq!(required_pipe_count(2247.0, 11.5), 195);
    assert_eq!(required_pipe_count(11.4, 11.5), 0);
    assert_eq!(required_pipe_count(23.0, 11.5), 2);
}

// ==========================================
// 步骤2
// ==========================================

#[test]
fn test_placeholder_uses_rounded_mean() {
    let estimator = StandEstimator::new();
    // 平均 (11 + 12 + 12) / 3 = 11.667
    let segments = deck_tally(30, &[11.0, 12.0, 12.0]);

    let state = estimator.estimate(50.0, &segments, &[], &[]).unwrap();

    assert_eq!(state.solution()[0].id(), "11.667");
    assert_eq!(state.solution()[0].length(), 11.667);
    // 4 × 11.667 = 46.668，第 5 根超出
    assert_eq!(state.length(), 46.668);
    assert_eq!(state.tally().triples, 1);
    assert_eq!(state.tally().singles, 1);
}

#[test]
fn test_gap_runs_are_split_per_assembly() {
    let estimator = StandEstimator::new();
    let segments = deck_tally(40, &[10.0]);
    let assemblies = vec![
        // 下限 80 → 长度 >= 120 放行（12 根）
        ConstrainedAssembly::new("packer", 2.0).with_lower_limit(80.0),
        // 间隔 5 根
        ConstrainedAssembly::new("dhsv", 1.0).with_separation_count(5),
        ConstrainedAssembly::new("hanger", 1.0).terminal(),
    ];

    let state = estimator.estimate(200.0, &segments, &assemblies, &[]).unwrap();

    // 12 根 → 4 三联；5 根 → 1 三联 + 1 双联；末端总成前 2 根 → 1 双联
    assert_eq!(state.gap_history(), &[12, 5, 2]);
    assert_eq!(state.tally().triples, 5);
    assert_eq!(state.tally().doubles, 2);
    assert_eq!(state.tally().singles, 0);
    assert_eq!(state.tally().assemblies, 3);
    assert_eq!(state.length(), 194.0);
}

#[test]
fn test_critical_point_in_estimate_requires_casing() {
    let estimator = StandEstimator::new();
    let segments = deck_tally(10, &[10.0]);
    let assemblies = vec![ConstrainedAssembly::new("dhsv", 1.0).with_critical_point(0.5)];

    let err = estimator
        .estimate(50.0, &segments, &assemblies, &[])
        .unwrap_err();
    assert!(matches!(err, PlanError::MissingCasingData { .. }));
}

#[test]
fn test_estimate_budget_is_inventory_plus_assemblies() {
    let estimator = StandEstimator::new();
    let segments = deck_tally(8, &[10.0]);
    let assemblies = vec![
        ConstrainedAssembly::new("packer", 2.0),
        ConstrainedAssembly::new("hanger", 1.0).terminal(),
    ];

    let err = estimator
        .estimate(1000.0, &segments, &assemblies, &[])
        .unwrap_err();
    assert_eq!(
        err,
        PlanError::IterationBudgetExceeded {
            pass: PlanPass::Estimate,
            limit: 10
        }
    );
}
