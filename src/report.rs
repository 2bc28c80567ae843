// ==========================================
// 上部完井管柱配管系统 - 结果报告
// ==========================================
// 职责: 三步流程结果 → 控制台表格 / JSON
// 内容: 概要、立柱需求、深度表、剩余库存
// ==========================================

use crate::domain::inventory::{DeckTally, Inventory};
use crate::domain::plan_state::DepthEntry;
use crate::domain::types::{round_length, PlanStatus, RackKind, UnitTally};
use crate::engine::orchestrator::TallyOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

// ==========================================
// 报告结构
// ==========================================

/// 剩余库存（单个容器）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeftoverRack {
    pub kind: RackKind,
    pub ids: Vec<String>,
    pub total_length: f64,
}

/// 详细排布概要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub calibrated_goal: f64,
    pub length: f64,
    pub residual_error: f64,
    pub status: PlanStatus,
    pub pipe_count: u32,
    pub tally: UnitTally,
    pub solution: Vec<String>,
}

/// 配管报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TallyReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub goal: f64,
    pub required_pipes: u32,
    pub stand_requirements: UnitTally,
    pub plan: PlanSummary,
    pub depth_table: Vec<DepthEntry>,
    pub leftover: Vec<LeftoverRack>,
}

impl TallyReport {
    /// 由流程结果生成报告
    pub fn from_outcome(outcome: &TallyOutcome) -> Self {
        let state = &outcome.plan.state;
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            goal: outcome.goal,
            required_pipes: outcome.required_pipes,
            stand_requirements: *outcome.estimate.state.tally(),
            plan: PlanSummary {
                calibrated_goal: outcome.plan.calibrated_goal,
                length: state.length(),
                residual_error: round_length(outcome.plan.residual_error(outcome.goal)),
                status: state.status(),
                pipe_count: state.joint_unit_count(),
                tally: *state.tally(),
                solution: state.solution().iter().map(|i| i.id().to_string()).collect(),
            },
            depth_table: state.depth_table(),
            leftover: state.leftover().map(leftover_racks).unwrap_or_default(),
        }
    }

    /// JSON 输出
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// 控制台输出
    pub fn render(&self) -> String {
        let mut out = String::new();
        // String 写入不会失败
        let _ = self.write_console(&mut out);
        out
    }

    fn write_console(&self, out: &mut String) -> std::fmt::Result {
        let rule = "=".repeat(50);
        writeln!(out, "{rule}")?;
        writeln!(out, "Upper completion tally  (run {})", self.run_id)?;
        writeln!(out, "Generated at {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(out, "{rule}")?;

        writeln!(out, "\nStep 1")?;
        writeln!(out, "{:.<24}: {}", "Required pipes", self.required_pipes)?;

        writeln!(out, "\nStep 2")?;
        let stands = &self.stand_requirements;
        writeln!(
            out,
            "{:.<24}: triples={}, doubles={}, singles={}",
            "Required stands", stands.triples, stands.doubles, stands.singles
        )?;

        writeln!(out, "\nStep 3")?;
        let plan = &self.plan;
        writeln!(out, "{:.<24}: {}", "Goal", self.goal)?;
        writeln!(out, "{:.<24}: {}", "Calibrated goal", plan.calibrated_goal)?;
        writeln!(out, "{:.<24}: {}", "Length", plan.length)?;
        writeln!(out, "{:.<24}: {}", "Residual error", plan.residual_error)?;
        writeln!(out, "{:.<24}: {}", "Status", plan.status)?;
        writeln!(out, "{:.<24}: {}", "Number of pipes", plan.pipe_count)?;
        writeln!(out, "{:.<24}: {}", "Number of types", plan.tally)?;

        writeln!(out, "\n| {:<12} | {:>10} | {:>10} | {:>10} |", "id", "top", "bottom", "critical")?;
        writeln!(out, "|{:-<14}|{:->12}|{:->12}|{:->12}|", "", "", "", "")?;
        for row in &self.depth_table {
            let critical = row
                .critical_depth
                .map(|d| format!("{d:.3}"))
                .unwrap_or_default();
            writeln!(
                out,
                "| {:<12} | {:>10.3} | {:>10.3} | {:>10} |",
                row.id, row.top_depth, row.bottom_depth, critical
            )?;
        }

        if !self.leftover.is_empty() {
            writeln!(out, "\nLeftover inventory")?;
            for rack in &self.leftover {
                writeln!(
                    out,
                    "{:.<24}: {} ({:.3} m) [{}]",
                    rack.kind.to_string(),
                    rack.ids.len(),
                    rack.total_length,
                    rack.ids.join(", ")
                )?;
            }
        }
        Ok(())
    }
}

/// 剩余库存按容器汇总
pub fn leftover_racks(deck: &DeckTally) -> Vec<LeftoverRack> {
    let racks: [(&dyn Inventory, Vec<(String, f64)>); 4] = [
        (
            &deck.triples,
            deck.triples.stands().iter().map(|s| (s.id.clone(), s.length())).collect(),
        ),
        (
            &deck.doubles,
            deck.doubles.stands().iter().map(|s| (s.id.clone(), s.length())).collect(),
        ),
        (
            &deck.singles,
            deck.singles.peek().iter().map(|s| (s.id.clone(), s.length)).collect(),
        ),
        (
            &deck.pups,
            deck.pups.peek().iter().map(|s| (s.id.clone(), s.length)).collect(),
        ),
    ];

    racks
        .into_iter()
        .map(|(rack, items)| LeftoverRack {
            kind: rack.kind(),
            total_length: items
                .iter()
                .fold(0.0, |total, (_, length)| round_length(total + length)),
            ids: items.into_iter().map(|(id, _)| id).collect(),
        })
        .collect()
}
