// ==========================================
// 上部完井管柱配管系统 - 管柱领域模型
// ==========================================
// 职责: 单根油管 (Segment)、立柱 (Stand) 及其统一视图 (Joint)
// 红线: 立柱组装后不可变，仅允许原位替换单根
// ==========================================

use crate::domain::types::{round_length, RackKind};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Segment - 单根油管 / 短节
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,  // 管号
    pub length: f64, // 长度 (m, 3 位小数)
    pub pup: bool,   // 短节标志（预留用于最终长度微调）
}

impl Segment {
    pub fn new(id: impl Into<String>, length: f64) -> Self {
        Self {
            id: id.into(),
            length: round_length(length),
            pup: false,
        }
    }

    pub fn pup(id: impl Into<String>, length: f64) -> Self {
        Self {
            pup: true,
            ..Self::new(id, length)
        }
    }

    pub fn set_pup(&mut self) {
        self.pup = true;
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

// ==========================================
// Stand - 立柱（三联 / 双联）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stand {
    pub id: String,
    segments: Vec<Segment>,
    length: f64,
}

impl Stand {
    /// 由单根组装立柱
    pub fn new(id: impl Into<String>, segments: Vec<Segment>) -> Self {
        let mut stand = Self {
            id: id.into(),
            segments,
            length: 0.0,
        };
        stand.update_length();
        stand
    }

    /// 空立柱（每个实例持有独立的空列表）
    pub fn empty(id: impl Into<String>) -> Self {
        Self::new(id, Vec::new())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn unit_count(&self) -> u32 {
        self.segments.len() as u32
    }

    /// 原位替换单根（事后修正用）
    ///
    /// # 返回
    /// - `true`: 找到并替换
    /// - `false`: 立柱中不存在 old_segment_id
    pub fn replace_segment(&mut self, old_segment_id: &str, new_segment: Segment) -> bool {
        let replaced = match self.segments.iter_mut().find(|s| s.id == old_segment_id) {
            Some(slot) => {
                *slot = new_segment;
                true
            }
            None => false,
        };
        if replaced {
            self.update_length();
        }
        replaced
    }

    /// 清空立柱
    pub fn reset(&mut self) {
        self.segments.clear();
        self.length = 0.0;
    }

    fn update_length(&mut self) {
        self.length = round_length(self.segments.iter().map(|s| s.length).sum());
    }
}

impl fmt::Display for Stand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

// ==========================================
// Joint - 可入井管柱（单根或立柱）
// ==========================================
// 用途: 料架统一出料视图，排布时按长度比较
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Joint {
    Single(Segment),
    Stand(Stand),
}

impl Joint {
    pub fn id(&self) -> &str {
        match self {
            Joint::Single(s) => &s.id,
            Joint::Stand(s) => &s.id,
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            Joint::Single(s) => s.length,
            Joint::Stand(s) => s.length(),
        }
    }

    pub fn unit_count(&self) -> u32 {
        match self {
            Joint::Single(_) => 1,
            Joint::Stand(s) => s.unit_count(),
        }
    }

    pub fn is_pup(&self) -> bool {
        matches!(self, Joint::Single(s) if s.pup)
    }

    /// 归类（三联/双联/单根/短节）
    pub fn kind(&self) -> Option<RackKind> {
        RackKind::classify(self.unit_count(), self.is_pup())
    }
}

impl From<Segment> for Joint {
    fn from(segment: Segment) -> Self {
        Joint::Single(segment)
    }
}

impl From<Stand> for Joint {
    fn from(stand: Stand) -> Self {
        Joint::Stand(stand)
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple() -> Stand {
        Stand::new(
            "1",
            vec![
                Segment::new("P1", 11.5),
                Segment::new("P2", 12.1),
                Segment::new("P3", 11.9),
            ],
        )
    }

    #[test]
    fn test_stand_length_and_units() {
        let stand = triple();
        assert_eq!(stand.length(), 35.5);
        assert_eq!(stand.unit_count(), 3);
    }

    #[test]
    fn test_empty_stands_do_not_share_segments() {
        let mut a = Stand::empty("A");
        let b = Stand::empty("B");
        assert!(!a.replace_segment("X", Segment::new("X", 1.0)));
        assert_eq!(a.unit_count(), 0);
        assert_eq!(a.length(), 0.0);
        assert_eq!(b.unit_count(), 0);
        assert!(b.segments().is_empty());
    }

    #[test]
    fn test_replace_segment_updates_length() {
        let mut stand = triple();
        assert!(stand.replace_segment("P2", Segment::new("P9", 10.1)));
        assert_eq!(stand.length(), 33.5);
        assert_eq!(stand.segments()[1].id, "P9");
        assert!(!stand.replace_segment("NOPE", Segment::new("P10", 1.0)));

        stand.reset();
        assert_eq!(stand.unit_count(), 0);
        assert_eq!(stand.length(), 0.0);
    }

    #[test]
    fn test_joint_kind() {
        assert_eq!(Joint::from(triple()).kind(), Some(RackKind::Triples));
        assert_eq!(Joint::from(Segment::new("S", 9.0)).kind(), Some(RackKind::Singles));
        assert_eq!(Joint::from(Segment::pup("U", 2.0)).kind(), Some(RackKind::Pups));
    }
}
