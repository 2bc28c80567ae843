// ==========================================
// 上部完井管柱配管系统 - 排布状态
// ==========================================
// 职责: 单次排布调用的可变状态（长度、序列、计数、间隔记录）
// 红线: 完成 (done) 后不得再修改
// 红线: 每次累加长度后取整到 3 位小数
// ==========================================
// 序列顺序为自下而上的下井顺序；深度表自上而下输出
// ==========================================

use crate::domain::assembly::ConstrainedAssembly;
use crate::domain::inventory::DeckTally;
use crate::domain::pipe::Joint;
use crate::domain::types::{round_length, PlanStatus, UnitTally};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

// ==========================================
// TallyItem - 管柱序列元素
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "item", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TallyItem {
    Joint(Joint),
    Assembly(ConstrainedAssembly),
}

impl TallyItem {
    pub fn id(&self) -> &str {
        match self {
            TallyItem::Joint(j) => j.id(),
            TallyItem::Assembly(a) => &a.id,
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            TallyItem::Joint(j) => j.length(),
            TallyItem::Assembly(a) => a.length,
        }
    }

    pub fn unit_count(&self) -> u32 {
        match self {
            TallyItem::Joint(j) => j.unit_count(),
            TallyItem::Assembly(_) => 1,
        }
    }

    /// 关键点偏移（仅总成可能有）
    pub fn critical_offset(&self) -> Option<f64> {
        match self {
            TallyItem::Joint(_) => None,
            TallyItem::Assembly(a) => a.critical_point_offset,
        }
    }
}

// ==========================================
// DepthEntry - 深度表行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthEntry {
    pub id: String,
    pub top_depth: f64,
    pub bottom_depth: f64,
    pub critical_depth: Option<f64>,
}

// ==========================================
// PlanState - 排布状态
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanState {
    pub goal: f64,                       // 目标长度 (m)
    solution: Vec<TallyItem>,            // 下井序列（自下而上）
    length: f64,                         // 当前长度 (m)
    status: PlanStatus,                  // 排布状态
    length_since_prev: f64,              // 距上一总成长度
    units_since_prev: u32,               // 距上一总成根数
    gap_history: Vec<u32>,               // 各总成间的根数记录
    casing_joints: Vec<f64>,             // 套管接箍深度（无序）
    tally: UnitTally,                    // 分类计数
    leftover: Option<DeckTally>,         // 剩余库存快照
}

impl PlanState {
    pub fn new(goal: f64) -> Self {
        Self {
            goal,
            solution: Vec::new(),
            length: 0.0,
            status: PlanStatus::InProgress,
            length_since_prev: 0.0,
            units_since_prev: 0,
            gap_history: Vec::new(),
            casing_joints: Vec::new(),
            tally: UnitTally::default(),
            leftover: None,
        }
    }

    pub fn with_casing_joints(mut self, joints: Vec<f64>) -> Self {
        self.casing_joints = joints;
        self
    }

    pub fn set_casing_joints(&mut self, joints: Vec<f64>) {
        self.casing_joints = joints;
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn solution(&self) -> &[TallyItem] {
        &self.solution
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn status(&self) -> PlanStatus {
        self.status
    }

    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }

    pub fn length_since_prev(&self) -> f64 {
        self.length_since_prev
    }

    pub fn units_since_prev(&self) -> u32 {
        self.units_since_prev
    }

    pub fn gap_history(&self) -> &[u32] {
        &self.gap_history
    }

    pub fn casing_joints(&self) -> &[f64] {
        &self.casing_joints
    }

    pub fn tally(&self) -> &UnitTally {
        &self.tally
    }

    pub fn leftover(&self) -> Option<&DeckTally> {
        self.leftover.as_ref()
    }

    /// 长度误差 = 目标 - 当前（正数表示不足，负数表示超出）
    pub fn length_error(&self) -> f64 {
        self.goal - self.length
    }

    /// 下井单根总数（立柱按单根数计）
    pub fn joint_unit_count(&self) -> u32 {
        self.solution
            .iter()
            .filter(|item| matches!(item, TallyItem::Joint(_)))
            .map(TallyItem::unit_count)
            .sum()
    }

    // ==========================================
    // 变更
    // ==========================================

    /// 放置总成
    ///
    /// 排布已完成时拒绝放置并返回 `false`
    pub fn place_assembly(&mut self, assembly: ConstrainedAssembly) -> bool {
        if self.is_done() {
            warn!(assembly_id = %assembly.id, status = %self.status, "排布已完成，拒绝放置总成");
            return false;
        }
        self.length = round_length(self.length + assembly.length);
        self.solution.push(TallyItem::Assembly(assembly));
        self.tally.assemblies += 1;

        if self.units_since_prev != 0 {
            self.gap_history.push(self.units_since_prev);
        }
        self.units_since_prev = 0;
        self.length_since_prev = 0.0;
        true
    }

    /// 放置管柱（单根 / 立柱 / 短节）
    ///
    /// 排布已完成时拒绝放置并返回 `false`
    pub fn place_segment(&mut self, joint: Joint) -> bool {
        if self.is_done() {
            warn!(joint_id = joint.id(), status = %self.status, "排布已完成，拒绝放置管柱");
            return false;
        }
        self.length = round_length(self.length + joint.length());
        self.length_since_prev = round_length(self.length_since_prev + joint.length());
        self.units_since_prev += joint.unit_count();

        if let Some(kind) = joint.kind() {
            self.tally.record(kind);
        }
        self.solution.push(TallyItem::Joint(joint));
        true
    }

    /// 标记完成（只生效一次，已完成的状态不被覆盖）
    pub fn finish(&mut self, status: PlanStatus) -> bool {
        if self.is_done() {
            warn!(current = %self.status, requested = %status, "排布已完成，忽略状态变更");
            return false;
        }
        self.status = status;
        true
    }

    /// 记录剩余库存快照
    pub fn set_leftover(&mut self, leftover: DeckTally) {
        self.leftover = Some(leftover);
    }

    /// 以间隔记录重算立柱需求（粗算第二步使用）
    ///
    /// 末段（最后一个总成之上）的根数一并计入；短节不参与拆分。
    pub fn convert_gaps_to_stands(&mut self) {
        if self.units_since_prev != 0 {
            self.gap_history.push(self.units_since_prev);
            self.units_since_prev = 0;
        }
        let assemblies = self.tally.assemblies;
        let mut tally = UnitTally {
            assemblies,
            ..UnitTally::default()
        };
        for run in &self.gap_history {
            tally.add_run(*run);
        }
        self.tally = tally;
    }

    // ==========================================
    // 深度表
    // ==========================================

    /// 深度表（自上而下）
    ///
    /// 每行输出 [顶深, 底深]，带关键点的总成额外输出关键点深度 (底深 - 偏移)
    pub fn depth_table(&self) -> Vec<DepthEntry> {
        let mut depth = 0.0;
        let mut rows = Vec::with_capacity(self.solution.len());
        for item in self.solution.iter().rev() {
            let top_depth = round_length(depth);
            depth += item.length();
            let bottom_depth = round_length(depth);
            let critical_depth = item
                .critical_offset()
                .map(|offset| round_length(depth - offset));
            rows.push(DepthEntry {
                id: item.id().to_string(),
                top_depth,
                bottom_depth,
                critical_depth,
            });
        }
        rows
    }

    /// 深度表（按 id 索引）
    pub fn depth_map(&self) -> HashMap<String, DepthEntry> {
        self.depth_table()
            .into_iter()
            .map(|row| (row.id.clone(), row))
            .collect()
    }
}

impl fmt::Display for PlanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:.<20}: {}", "Goal", self.goal)?;
        writeln!(f, "{:.<20}: {}", "Length", self.length)?;
        writeln!(f, "{:.<20}: {}", "Status", self.status)?;
        writeln!(f, "{:.<20}: {}", "Number of pipes", self.joint_unit_count())?;
        writeln!(f, "{:.<20}: {}", "Number of types", self.tally)?;
        let ids: Vec<&str> = self.solution.iter().map(TallyItem::id).collect();
        write!(f, "{:.<20}: [{}]", "Solution", ids.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pipe::{Segment, Stand};

    fn single(id: &str, length: f64) -> Joint {
        Joint::Single(Segment::new(id, length))
    }

    #[test]
    fn test_new_state() {
        let state = PlanState::new(1000.0);
        assert_eq!(state.goal, 1000.0);
        assert_eq!(state.length(), 0.0);
        assert!(!state.is_done());
        assert!(state.solution().is_empty());
        assert!(state.casing_joints().is_empty());
    }

    #[test]
    fn test_place_segment_rounds_every_step() {
        let mut state = PlanState::new(10_000.0);
        let mut expected = 0.0;
        for i in 0..300 {
            state.place_segment(single(&format!("P{i}"), 0.1));
            expected = round_length(expected + 0.1);
            assert_eq!(state.length(), expected);
        }
        assert_eq!(state.length(), 30.0);
    }

    #[test]
    fn test_length_error_sign() {
        let mut state = PlanState::new(100.0);
        state.place_segment(single("P1", 95.0));
        assert_eq!(state.length_error(), 5.0);

        let mut over = PlanState::new(100.0);
        over.place_segment(single("P1", 105.0));
        assert_eq!(over.length_error(), -5.0);
    }

    #[test]
    fn test_place_assembly_records_gap() {
        let mut state = PlanState::new(200.0);
        state.place_assembly(ConstrainedAssembly::new("A0", 5.0));
        assert!(state.gap_history().is_empty());

        state.place_segment(single("P1", 10.0));
        state.place_segment(single("P2", 11.0));
        assert_eq!(state.units_since_prev(), 2);
        assert_eq!(state.length_since_prev(), 21.0);

        state.place_assembly(ConstrainedAssembly::new("A1", 5.0));
        assert_eq!(state.gap_history(), &[2]);
        assert_eq!(state.units_since_prev(), 0);
        assert_eq!(state.length_since_prev(), 0.0);
        assert_eq!(state.length(), 31.0);
        assert_eq!(state.tally().assemblies, 2);
    }

    #[test]
    fn test_tally_classification() {
        let mut state = PlanState::new(200.0);
        let triple = Stand::new(
            "T1",
            vec![
                Segment::new("a", 11.0),
                Segment::new("b", 12.0),
                Segment::new("c", 12.0),
            ],
        );
        let double = Stand::new("D1", vec![Segment::new("d", 12.0), Segment::new("e", 12.0)]);
        state.place_segment(Joint::Stand(triple));
        state.place_segment(Joint::Stand(double));
        state.place_segment(single("S1", 12.0));
        state.place_segment(Joint::Single(Segment::pup("U1", 2.5)));

        let tally = state.tally();
        assert_eq!(tally.triples, 1);
        assert_eq!(tally.doubles, 1);
        assert_eq!(tally.singles, 1);
        assert_eq!(tally.pups, 1);
        assert_eq!(state.units_since_prev(), 7);
        assert_eq!(state.joint_unit_count(), 7);
    }

    #[test]
    fn test_depth_table_empty() {
        let state = PlanState::new(100.0);
        assert!(state.depth_table().is_empty());
        assert!(state.depth_map().is_empty());
    }

    #[test]
    fn test_depth_table_top_down() {
        let mut state = PlanState::new(50.0);
        // 下井顺序 S2 → A1 → S1，深度表自上而下为 S1, A1, S2
        state.place_segment(single("S2", 15.0));
        state.place_assembly(ConstrainedAssembly::new("A1", 10.0));
        state.place_segment(single("S1", 20.0));

        let table = state.depth_map();
        assert_eq!(table["S1"].top_depth, 0.0);
        assert_eq!(table["S1"].bottom_depth, 20.0);
        assert_eq!(table["A1"].top_depth, 20.0);
        assert_eq!(table["A1"].bottom_depth, 30.0);
        assert_eq!(table["S2"].top_depth, 30.0);
        assert_eq!(table["S2"].bottom_depth, 45.0);
    }

    #[test]
    fn test_done_state_rejects_mutation() {
        let mut state = PlanState::new(50.0);
        assert!(state.place_segment(single("S1", 20.0)));
        assert!(state.finish(PlanStatus::Completed));

        assert!(!state.place_segment(single("S2", 10.0)));
        assert!(!state.place_assembly(ConstrainedAssembly::new("A1", 5.0)));
        assert!(!state.finish(PlanStatus::Stalled));

        assert_eq!(state.status(), PlanStatus::Completed);
        assert_eq!(state.length(), 20.0);
        assert_eq!(state.solution().len(), 1);
        assert_eq!(state.tally().assemblies, 0);
    }

    #[test]
    fn test_depth_table_critical_depth() {
        let mut state = PlanState::new(100.0);
        state.place_segment(single("S1", 30.0));
        state.place_assembly(ConstrainedAssembly::new("A1", 10.0).with_critical_point(2.0));
        state.place_segment(single("S2", 20.0));

        let rows = state.depth_table();
        assert_eq!(rows[0].id, "S2");
        assert_eq!(rows[1].id, "A1");
        assert_eq!(rows[1].top_depth, 20.0);
        assert_eq!(rows[1].bottom_depth, 30.0);
        assert_eq!(rows[1].critical_depth, Some(28.0));
        assert_eq!(rows[2].critical_depth, None);
    }

    #[test]
    fn test_convert_gaps_to_stands_includes_trailing_run() {
        let mut state = PlanState::new(500.0);
        for i in 0..8 {
            state.place_segment(single(&format!("P{i}"), 11.5));
        }
        state.place_assembly(ConstrainedAssembly::new("A1", 5.0));
        for i in 8..12 {
            state.place_segment(single(&format!("P{i}"), 11.5));
        }

        state.convert_gaps_to_stands();
        let tally = state.tally();
        assert_eq!(tally.triples, 3);
        assert_eq!(tally.doubles, 1);
        assert_eq!(tally.singles, 1);
        assert_eq!(tally.pups, 0);
        assert_eq!(tally.assemblies, 1);
    }
}
