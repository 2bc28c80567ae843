// ==========================================
// 上部完井管柱配管系统 - 总成约束评估
// ==========================================
// 职责: 五项放置约束的统一评估
// 模式: 刷新模式（写回放行标志）/ 试算模式（假设再下一根管柱，不修改状态）
// 红线: 两种模式共用同一约束定义，评估前状态不因候选管柱改变
// ==========================================

use crate::domain::assembly::ConstrainedAssembly;
use crate::domain::pipe::Joint;
use crate::domain::plan_state::PlanState;
use crate::engine::error::{PlanError, PlanResult};

// ==========================================
// PlanView - 排布状态只读快照
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct PlanView<'a> {
    pub goal: f64,
    pub length: f64,
    pub length_since_prev: f64,
    pub units_since_prev: u32,
    pub casing_joints: &'a [f64],
}

impl<'a> From<&'a PlanState> for PlanView<'a> {
    fn from(state: &'a PlanState) -> Self {
        Self {
            goal: state.goal,
            length: state.length(),
            length_since_prev: state.length_since_prev(),
            units_since_prev: state.units_since_prev(),
            casing_joints: state.casing_joints(),
        }
    }
}

// ==========================================
// Constraint - 单项约束
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    /// 下限深度：总成底端须已到达 goal - depth 以上
    LowerLimit(f64),
    /// 上限深度
    UpperLimit(f64),
    /// 距上一总成最小长度
    SeparationLength(f64),
    /// 距上一总成最少根数
    SeparationCount(u32),
    /// 关键点避开套管接箍
    CriticalPoint { offset: f64, margin: f64 },
}

impl Constraint {
    /// 评估约束是否放行
    ///
    /// # 参数
    /// - `assembly`: 被评估的总成
    /// - `view`: 当前排布快照
    /// - `candidate`: None 为刷新模式；Some 为试算模式（假设先下入该管柱）
    ///
    /// # 说明
    /// 上限约束两种模式判据不同：刷新模式按距井口深度，试算模式按累计长度，
    /// 关键点在试算模式下距离恰好等于余量时放行。
    pub fn is_clear(
        &self,
        assembly: &ConstrainedAssembly,
        view: &PlanView<'_>,
        candidate: Option<&Joint>,
    ) -> PlanResult<bool> {
        let added_length = candidate.map(Joint::length).unwrap_or(0.0);
        let added_units = candidate.map(Joint::unit_count).unwrap_or(0);
        let length = view.length + added_length;

        let clear = match *self {
            Constraint::LowerLimit(depth) => length >= view.goal - depth,
            Constraint::UpperLimit(depth) => match candidate {
                None => view.length + assembly.length < view.goal - depth,
                Some(_) => length + assembly.length <= depth,
            },
            Constraint::SeparationLength(distance) => {
                view.length_since_prev + added_length >= distance
            }
            Constraint::SeparationCount(count) => view.units_since_prev + added_units >= count,
            Constraint::CriticalPoint { offset, margin } => {
                let critical_depth = view.goal - (length + offset);
                let distance = nearest_joint_distance(view.casing_joints, critical_depth)
                    .ok_or_else(|| PlanError::MissingCasingData {
                        assembly_id: assembly.id.clone(),
                    })?;
                match candidate {
                    None => distance > margin,
                    Some(_) => distance >= margin,
                }
            }
        };
        Ok(clear)
    }
}

/// 距最近套管接箍的距离（无接箍数据返回 None）
pub fn nearest_joint_distance(casing_joints: &[f64], depth: f64) -> Option<f64> {
    casing_joints
        .iter()
        .map(|joint| (joint - depth).abs())
        .min_by(|a, b| a.total_cmp(b))
}

// ==========================================
// Trait: ConstraintCheck
// ==========================================
// 用途: 排布引擎对约束总成的评估接口
pub trait ConstraintCheck {
    /// 已设置的约束列表
    fn constraints(&self) -> Vec<Constraint>;

    /// 刷新模式：按当前状态重算全部放行标志
    fn refresh_against_plan(&mut self, state: &PlanState) -> PlanResult<()>;

    /// 试算模式：下入候选管柱后总成是否可放置（纯函数）
    fn would_clear_with(&self, state: &PlanState, candidate: &Joint) -> PlanResult<bool>;
}

impl ConstraintCheck for ConstrainedAssembly {
    fn constraints(&self) -> Vec<Constraint> {
        let mut constraints = Vec::with_capacity(5);
        if let Some(depth) = self.lower_limit {
            constraints.push(Constraint::LowerLimit(depth));
        }
        if let Some(depth) = self.upper_limit {
            constraints.push(Constraint::UpperLimit(depth));
        }
        if let Some(distance) = self.separation_length {
            constraints.push(Constraint::SeparationLength(distance));
        }
        if let Some(count) = self.separation_count {
            constraints.push(Constraint::SeparationCount(count));
        }
        if let Some(offset) = self.critical_point_offset {
            constraints.push(Constraint::CriticalPoint {
                offset,
                margin: self.critical_margin,
            });
        }
        constraints
    }

    fn refresh_against_plan(&mut self, state: &PlanState) -> PlanResult<()> {
        let view = PlanView::from(state);
        for constraint in self.constraints() {
            let clear = constraint.is_clear(self, &view, None)?;
            let slot = match constraint {
                Constraint::LowerLimit(_) => &mut self.clears.lower_limit,
                Constraint::UpperLimit(_) => &mut self.clears.upper_limit,
                Constraint::SeparationLength(_) => &mut self.clears.separation_length,
                Constraint::SeparationCount(_) => &mut self.clears.separation_count,
                Constraint::CriticalPoint { .. } => &mut self.clears.critical_point,
            };
            *slot = clear;
        }
        Ok(())
    }

    fn would_clear_with(&self, state: &PlanState, candidate: &Joint) -> PlanResult<bool> {
        let view = PlanView::from(state);
        let mut clear = true;
        for constraint in self.constraints() {
            // 不短路：关键点缺少接箍数据时必须报错
            clear &= constraint.is_clear(self, &view, Some(candidate))?;
        }
        Ok(clear)
    }
}
