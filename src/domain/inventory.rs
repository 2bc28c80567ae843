// ==========================================
// 上部完井管柱配管系统 - 库存容器
// ==========================================
// 职责: 甲板库存（立柱架 + 单根/短节堆）
// 红线: 同一物理管柱不得重复使用
// ==========================================
// 立柱架 (StandStack): 后进先出，仅最外侧立柱可取
// 管堆 (SegmentPool): 无序，全部可取，按管号取出
// ==========================================

use crate::domain::pipe::{Joint, Segment, Stand};
use crate::domain::types::RackKind;
use serde::{Deserialize, Serialize};

// ==========================================
// Trait: Inventory
// ==========================================
// 用途: 排布引擎统一出料接口，不在调用处按容器类型分支
pub trait Inventory {
    /// 容器类别
    fn kind(&self) -> RackKind;

    /// 当前可取的管柱
    fn peek_available(&self) -> Vec<Joint>;

    /// 取出指定管柱
    ///
    /// # 返回
    /// - `Some(Joint)`: 取出成功
    /// - `None`: 该管柱当前不可取（不在堆中或不在架最外侧）
    fn take_specific(&mut self, id: &str) -> Option<Joint>;

    /// 取出与 peek_available 给出的管柱完全一致的项
    fn take_joint(&mut self, joint: &Joint) -> Option<Joint> {
        self.take_specific(joint.id())
    }

    /// 剩余数量
    fn remaining(&self) -> usize;
}

// ==========================================
// StandStack - 立柱架
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandStack {
    kind: RackKind,
    stands: Vec<Stand>,
}

impl StandStack {
    pub fn new(kind: RackKind) -> Self {
        Self {
            kind,
            stands: Vec::new(),
        }
    }

    /// 依次上架（保持顺序，最后一个位于最外侧）
    pub fn push(&mut self, stands: impl IntoIterator<Item = Stand>) {
        self.stands.extend(stands);
    }

    /// 最外侧立柱（空架返回空切片）
    pub fn peek(&self) -> &[Stand] {
        match self.stands.len() {
            0 => &[],
            n => &self.stands[n - 1..],
        }
    }

    /// 取下最外侧立柱
    pub fn pop(&mut self) -> Option<Stand> {
        self.stands.pop()
    }

    pub fn stands(&self) -> &[Stand] {
        &self.stands
    }
}

impl Inventory for StandStack {
    fn kind(&self) -> RackKind {
        self.kind
    }

    fn peek_available(&self) -> Vec<Joint> {
        self.peek().iter().cloned().map(Joint::Stand).collect()
    }

    fn take_specific(&mut self, id: &str) -> Option<Joint> {
        match self.stands.last() {
            Some(top) if top.id == id => self.pop().map(Joint::Stand),
            _ => None,
        }
    }

    fn remaining(&self) -> usize {
        self.stands.len()
    }
}

// ==========================================
// SegmentPool - 单根 / 短节堆
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentPool {
    kind: RackKind,
    segments: Vec<Segment>,
}

impl SegmentPool {
    pub fn new(kind: RackKind) -> Self {
        Self {
            kind,
            segments: Vec::new(),
        }
    }

    pub fn add(&mut self, segments: impl IntoIterator<Item = Segment>) {
        self.segments.extend(segments);
    }

    /// 全部管柱
    pub fn peek(&self) -> &[Segment] {
        &self.segments
    }

    /// 按管号取出第一个匹配项
    pub fn remove_by_id(&mut self, id: &str) -> Option<Segment> {
        let index = self.segments.iter().position(|s| s.id == id)?;
        Some(self.segments.remove(index))
    }

    /// 取出与给定单根完全一致的项（管号与长度均相同）
    pub fn remove_exact(&mut self, segment: &Segment) -> Option<Segment> {
        let index = self.segments.iter().position(|s| s == segment)?;
        Some(self.segments.remove(index))
    }
}

impl Inventory for SegmentPool {
    fn kind(&self) -> RackKind {
        self.kind
    }

    fn peek_available(&self) -> Vec<Joint> {
        self.segments.iter().cloned().map(Joint::Single).collect()
    }

    fn take_specific(&mut self, id: &str) -> Option<Joint> {
        self.remove_by_id(id).map(Joint::Single)
    }

    // 管号可能重复，按完整内容匹配
    fn take_joint(&mut self, joint: &Joint) -> Option<Joint> {
        match joint {
            Joint::Single(segment) => self.remove_exact(segment).map(Joint::Single),
            Joint::Stand(_) => None,
        }
    }

    fn remaining(&self) -> usize {
        self.segments.len()
    }
}

// ==========================================
// Candidate - 可取管柱及其来源
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub origin: RackKind,
    pub joint: Joint,
}

// ==========================================
// DeckTally - 甲板库存（四个容器）
// ==========================================
// 每次排布调用都必须使用新建的 DeckTally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckTally {
    pub triples: StandStack,
    pub doubles: StandStack,
    pub singles: SegmentPool,
    pub pups: SegmentPool,
}

impl DeckTally {
    pub fn new(
        triples: Vec<Stand>,
        doubles: Vec<Stand>,
        singles: Vec<Segment>,
        pups: Vec<Segment>,
    ) -> Self {
        let mut tally = Self::default();
        tally.triples.push(triples);
        tally.doubles.push(doubles);
        tally.singles.add(singles);
        tally.pups.add(pups);
        tally
    }

    fn racks(&self) -> [&dyn Inventory; 4] {
        [&self.triples, &self.doubles, &self.singles, &self.pups]
    }

    fn rack_mut(&mut self, kind: RackKind) -> &mut dyn Inventory {
        match kind {
            RackKind::Triples => &mut self.triples,
            RackKind::Doubles => &mut self.doubles,
            RackKind::Singles => &mut self.singles,
            RackKind::Pups => &mut self.pups,
        }
    }

    /// 当前可取管柱，按长度升序（长度相同保持容器顺序）
    ///
    /// # 参数
    /// - `include_pups`: 是否包含短节堆
    pub fn available_sorted(&self, include_pups: bool) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .racks()
            .into_iter()
            .filter(|rack| include_pups || rack.kind() != RackKind::Pups)
            .flat_map(|rack| {
                let origin = rack.kind();
                rack.peek_available()
                    .into_iter()
                    .map(move |joint| Candidate { origin, joint })
            })
            .collect();
        candidates.sort_by(|a, b| a.joint.length().total_cmp(&b.joint.length()));
        candidates
    }

    /// 从来源容器取出候选管柱
    pub fn take(&mut self, candidate: &Candidate) -> Option<Joint> {
        self.rack_mut(candidate.origin).take_joint(&candidate.joint)
    }

    /// 剩余总数
    pub fn remaining(&self) -> usize {
        self.racks().iter().map(|r| r.remaining()).sum()
    }
}

impl Default for DeckTally {
    fn default() -> Self {
        Self {
            triples: StandStack::new(RackKind::Triples),
            doubles: StandStack::new(RackKind::Doubles),
            singles: SegmentPool::new(RackKind::Singles),
            pups: SegmentPool::new(RackKind::Pups),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stand(id: &str, length: f64) -> Stand {
        Stand::new(id, vec![Segment::new(format!("{id}-a"), length)])
    }

    #[test]
    fn test_stack_is_lifo() {
        let mut stack = StandStack::new(RackKind::Triples);
        stack.push(vec![stand("T1", 30.0), stand("T2", 31.0)]);

        assert_eq!(stack.peek().len(), 1);
        assert_eq!(stack.peek()[0].id, "T2");
        assert_eq!(stack.pop().map(|s| s.id), Some("T2".to_string()));
        assert_eq!(stack.pop().map(|s| s.id), Some("T1".to_string()));
        assert!(stack.pop().is_none());
        assert!(stack.peek().is_empty());
    }

    #[test]
    fn test_stack_take_specific_only_top() {
        let mut stack = StandStack::new(RackKind::Doubles);
        stack.push(vec![stand("D1", 20.0), stand("D2", 21.0)]);

        assert!(stack.take_specific("D1").is_none());
        assert_eq!(stack.take_specific("D2").map(|j| j.id().to_string()), Some("D2".to_string()));
        assert_eq!(stack.remaining(), 1);
    }

    #[test]
    fn test_pool_remove_by_id() {
        let mut pool = SegmentPool::new(RackKind::Singles);
        pool.add(vec![Segment::new("P1", 11.0), Segment::new("P2", 12.0)]);

        assert_eq!(pool.remove_by_id("P1").map(|s| s.id), Some("P1".to_string()));
        assert_eq!(pool.peek().len(), 1);
        assert_eq!(pool.peek()[0].id, "P2");
        assert!(pool.remove_by_id("P1").is_none());
    }

    #[test]
    fn test_pool_remove_independent_of_insertion_order() {
        let mut pool = SegmentPool::new(RackKind::Singles);
        pool.add(vec![Segment::new("P2", 12.0), Segment::new("P1", 11.0)]);

        pool.remove_by_id("P1");
        assert_eq!(pool.peek().len(), 1);
        assert_eq!(pool.peek()[0].id, "P2");
    }

    #[test]
    fn test_available_sorted_excludes_pups() {
        let deck = DeckTally::new(
            vec![stand("T1", 35.0)],
            vec![stand("D1", 24.0)],
            vec![Segment::new("S1", 12.0)],
            vec![Segment::pup("U1", 2.0)],
        );

        let with_pups = deck.available_sorted(true);
        let ids: Vec<&str> = with_pups.iter().map(|c| c.joint.id()).collect();
        assert_eq!(ids, vec!["U1", "S1", "D1", "T1"]);

        let without_pups = deck.available_sorted(false);
        assert_eq!(without_pups.len(), 3);
        assert!(without_pups.iter().all(|c| c.origin != RackKind::Pups));
    }

    #[test]
    fn test_take_removes_from_origin() {
        let mut deck = DeckTally::new(
            vec![stand("T1", 35.0), stand("T2", 34.0)],
            vec![],
            vec![Segment::new("S1", 12.0)],
            vec![],
        );

        let candidates = deck.available_sorted(true);
        let top = candidates.iter().find(|c| c.origin == RackKind::Triples).cloned();
        let top = top.expect("top stand");
        assert_eq!(top.joint.id(), "T2");

        assert!(deck.take(&top).is_some());
        assert_eq!(deck.triples.peek()[0].id, "T1");
        assert_eq!(deck.remaining(), 2);
    }

    #[test]
    fn test_take_matches_evaluated_segment_with_duplicate_ids() {
        let mut deck = DeckTally::new(
            vec![],
            vec![],
            vec![Segment::new("P", 10.0), Segment::new("P", 12.0)],
            vec![],
        );

        let longest = deck.available_sorted(true).pop().expect("candidate");
        assert_eq!(longest.joint.length(), 12.0);

        let taken = deck.take(&longest).expect("taken");
        assert_eq!(taken.length(), 12.0);
        assert_eq!(deck.singles.peek(), &[Segment::new("P", 10.0)]);
    }

    #[test]
    fn test_pool_remove_exact() {
        let mut pool = SegmentPool::new(RackKind::Pups);
        pool.add(vec![Segment::pup("U", 2.0), Segment::pup("U", 3.0)]);

        assert!(pool.remove_exact(&Segment::pup("U", 4.0)).is_none());
        assert_eq!(pool.remove_exact(&Segment::pup("U", 3.0)).map(|s| s.length), Some(3.0));
        assert_eq!(pool.peek().len(), 1);
        assert_eq!(pool.peek()[0].length, 2.0);
    }
}
