// ==========================================
// 上部完井管柱配管系统 - 管柱清单导入器
// ==========================================
// 职责: 甲板清单 / 短节清单 / 立柱组成 / 总成表 / 套管接箍 → 领域对象
// 红线: 立柱中的单根必须能在甲板清单中找到
// 红线: 单根堆 = 甲板清单 - 已组成立柱的单根
// ==========================================

use crate::config::{AssemblySource, CasingSource, ImportLayout, StandSource, TallySource};
use crate::domain::assembly::{AssemblyRecord, ConstrainedAssembly};
use crate::domain::inventory::DeckTally;
use crate::domain::pipe::{Segment, Stand};
use crate::domain::types::{round_length, round_to, RackKind};
use crate::engine::orchestrator::TallyInputs;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{SheetParser, SheetRows, UniversalFileParser};
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// 套管接箍深度保留位数
const CASING_DECIMALS: i32 = 2;

/// 总成表列数
const ASSEMBLY_COLUMNS: usize = 8;

// ==========================================
// TallyImporter - 管柱清单导入器
// ==========================================
pub struct TallyImporter<P: SheetParser = UniversalFileParser> {
    parser: P,
}

impl TallyImporter<UniversalFileParser> {
    pub fn new() -> Self {
        Self {
            parser: UniversalFileParser,
        }
    }
}

impl Default for TallyImporter<UniversalFileParser> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: SheetParser> TallyImporter<P> {
    pub fn with_parser(parser: P) -> Self {
        Self { parser }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 按导入布局读取全部输入
    ///
    /// 甲板清单必须配置；其余数据源缺省为空
    #[instrument(skip(self, layout))]
    pub fn import_all(&self, layout: &ImportLayout) -> ImportResult<TallyInputs> {
        let deck_source = layout
            .deck_tally
            .as_ref()
            .ok_or_else(|| ImportError::SourceNotConfigured("import.deck_tally".to_string()))?;
        let segments = self.import_segments(deck_source, false)?;

        let pups = match &layout.pup_tally {
            Some(source) => self.import_segments(source, true)?,
            None => Vec::new(),
        };
        let triples = match &layout.triples {
            Some(source) => self.import_stands(source, RackKind::Triples, &segments)?,
            None => Vec::new(),
        };
        let doubles = match &layout.doubles {
            Some(source) => self.import_stands(source, RackKind::Doubles, &segments)?,
            None => Vec::new(),
        };
        ensure_disjoint_stands(&triples, &doubles)?;
        let assemblies = match &layout.assemblies {
            Some(source) => self.import_assemblies(source)?,
            None => Vec::new(),
        };

        let mut casing_joints = Vec::new();
        for source in &layout.casing {
            casing_joints.extend(self.import_casing_joints(source)?);
        }
        if casing_joints.is_empty() {
            warn!("未导入套管接箍深度，带关键点的总成将无法校核");
        }

        let singles = remaining_singles(&segments, triples.iter().chain(doubles.iter()));

        info!(
            segments = segments.len(),
            triples = triples.len(),
            doubles = doubles.len(),
            singles = singles.len(),
            pups = pups.len(),
            assemblies = assemblies.len(),
            casing_joints = casing_joints.len(),
            "导入完成"
        );

        Ok(TallyInputs {
            deck: DeckTally::new(triples, doubles, singles, pups),
            segments,
            assemblies,
            casing_joints,
        })
    }

    /// 读取管柱清单（长度保留 3 位小数）
    ///
    /// 管号与长度均为空的行跳过；同一清单内管号不得重复
    pub fn import_segments(&self, source: &TallySource, pups: bool) -> ImportResult<Vec<Segment>> {
        let sheet = self.parse(&source.path, source.sheet.as_deref())?;
        let ids = sheet.column(&source.id_column, source.rows)?;
        let lengths = sheet.column(&source.length_column, source.rows)?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut segments = Vec::with_capacity(ids.len());
        for ((row, id), (_, length)) in ids.into_iter().zip(lengths) {
            if id.is_empty() && length.is_empty() {
                continue;
            }
            let length = parse_number(&length, row, "length")?;
            let id = normalize_id(&id);
            if !seen.insert(id.clone()) {
                return Err(ImportError::DuplicateId {
                    file: sheet.source.clone(),
                    id,
                });
            }
            let mut segment = Segment::new(id, round_length(length));
            if pups {
                segment.set_pup();
            }
            segments.push(segment);
        }
        Ok(segments)
    }

    /// 读取套管接箍深度（保留 2 位小数，非数值单元格跳过）
    pub fn import_casing_joints(&self, source: &CasingSource) -> ImportResult<Vec<f64>> {
        let sheet = self.parse(&source.path, source.sheet.as_deref())?;
        Ok(sheet
            .column(&source.column, source.rows)?
            .into_iter()
            .filter_map(|(_, cell)| cell.parse::<f64>().ok())
            .filter(|depth| depth.is_finite())
            .map(|depth| round_to(depth, CASING_DECIMALS))
            .collect())
    }

    /// 读取立柱组成
    ///
    /// 管号列按 3 个（三联）或 2 个（双联）一组，不足一组的余数忽略。
    /// 三联编号 "1", "2", ...；双联编号 "Dbl1", "Dbl2", ...
    pub fn import_stands(
        &self,
        source: &StandSource,
        kind: RackKind,
        deck: &[Segment],
    ) -> ImportResult<Vec<Stand>> {
        let group = match kind {
            RackKind::Triples => 3,
            RackKind::Doubles => 2,
            other => {
                return Err(ImportError::StandCompositionError {
                    stand_id: other.to_string(),
                    message: "只能组成三联或双联立柱".to_string(),
                })
            }
        };

        let sheet = self.parse(&source.path, source.sheet.as_deref())?;
        let ids: Vec<String> = sheet
            .column(&source.id_column, source.rows)?
            .into_iter()
            .filter_map(|(_, cell)| numeric_id(&cell))
            .collect();

        let mut used: HashSet<&str> = HashSet::new();
        let mut stands = Vec::with_capacity(ids.len() / group);
        for (index, chunk) in ids.chunks_exact(group).enumerate() {
            let stand_id = match kind {
                RackKind::Doubles => format!("Dbl{}", index + 1),
                _ => (index + 1).to_string(),
            };
            let mut segments = Vec::with_capacity(group);
            for id in chunk {
                let segment = deck.iter().find(|s| &s.id == id).ok_or_else(|| {
                    ImportError::StandCompositionError {
                        stand_id: stand_id.clone(),
                        message: format!("甲板清单中找不到管号 {id}"),
                    }
                })?;
                if !used.insert(segment.id.as_str()) {
                    return Err(ImportError::StandCompositionError {
                        stand_id,
                        message: format!("管号 {id} 重复使用"),
                    });
                }
                segments.push(segment.clone());
            }
            stands.push(Stand::new(stand_id, segments));
        }

        if ids.len() % group != 0 {
            warn!(
                kind = %kind,
                ignored = ids.len() % group,
                "立柱管号数量不是整组，余数忽略"
            );
        }
        Ok(stands)
    }

    /// 读取总成表（每行前 8 列，空单元格视为未设置）
    pub fn import_assemblies(&self, source: &AssemblySource) -> ImportResult<Vec<ConstrainedAssembly>> {
        let sheet = self.parse(&source.path, source.sheet.as_deref())?;
        if sheet.width() < ASSEMBLY_COLUMNS {
            return Err(ImportError::ColumnOrRangeError {
                file: sheet.source.clone(),
                message: format!("总成表至少需要 {ASSEMBLY_COLUMNS} 列，实际 {}", sheet.width()),
            });
        }

        let mut assemblies = Vec::new();
        for (row, cells) in sheet.rows_in(source.rows)? {
            let cell = |i: usize| cells.get(i).map(String::as_str).unwrap_or("");
            if (0..ASSEMBLY_COLUMNS).all(|i| cell(i).is_empty()) {
                continue;
            }
            let record = AssemblyRecord {
                id: normalize_id(cell(0)),
                length: parse_number(cell(1), row, "length")?,
                lower_limit: parse_optional(cell(2), row, "lower_limit")?,
                upper_limit: parse_optional(cell(3), row, "upper_limit")?,
                is_terminal: parse_flag(cell(4), row, "is_terminal")?,
                separation_length: parse_optional(cell(5), row, "separation_length")?,
                separation_count: parse_optional(cell(6), row, "separation_count")?
                    .map(|count| count.round().max(0.0) as u32),
                critical_point_offset: parse_optional(cell(7), row, "critical_point_offset")?,
            };
            assemblies.push(ConstrainedAssembly::from(record));
        }
        Ok(assemblies)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn parse(&self, path: &std::path::Path, sheet: Option<&str>) -> ImportResult<SheetRows> {
        self.parser.parse_rows(path, sheet)
    }
}

/// 单根堆 = 甲板清单 - 立柱中的单根
pub fn remaining_singles<'a>(
    deck: &[Segment],
    stands: impl IntoIterator<Item = &'a Stand>,
) -> Vec<Segment> {
    let used: HashSet<&str> = stands
        .into_iter()
        .flat_map(|stand| stand.segments().iter().map(|s| s.id.as_str()))
        .collect();
    deck.iter()
        .filter(|segment| !used.contains(segment.id.as_str()))
        .cloned()
        .collect()
}

/// 三联与双联不得共用同一根单根
fn ensure_disjoint_stands(triples: &[Stand], doubles: &[Stand]) -> ImportResult<()> {
    let used: HashSet<&str> = triples
        .iter()
        .flat_map(|stand| stand.segments().iter().map(|s| s.id.as_str()))
        .collect();
    for stand in doubles {
        if let Some(segment) = stand.segments().iter().find(|s| used.contains(s.id.as_str())) {
            return Err(ImportError::StandCompositionError {
                stand_id: stand.id.clone(),
                message: format!("管号 {} 已用于三联立柱", segment.id),
            });
        }
    }
    Ok(())
}

/// 管号规范化：整数值去掉小数部分（"12.0" → "12"）
fn normalize_id(cell: &str) -> String {
    let cell = cell.trim();
    match cell.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 => format!("{}", value as i64),
        _ => cell.to_string(),
    }
}

/// 立柱组成列中的管号（仅接受数值，四舍五入取整）
fn numeric_id(cell: &str) -> Option<String> {
    let value = cell.trim().parse::<f64>().ok()?;
    value.is_finite().then(|| format!("{}", value.round() as i64))
}

fn parse_number(cell: &str, row: usize, field: &str) -> ImportResult<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ImportError::TypeConversionError {
            row,
            field: field.to_string(),
            message: format!("无法解析为数值: '{cell}'"),
        })
}

fn parse_optional(cell: &str, row: usize, field: &str) -> ImportResult<Option<f64>> {
    if cell.trim().is_empty() {
        Ok(None)
    } else {
        parse_number(cell, row, field).map(Some)
    }
}

fn parse_flag(cell: &str, row: usize, field: &str) -> ImportResult<bool> {
    let value = cell.trim().to_lowercase();
    match value.as_str() {
        "" | "false" | "no" | "n" => Ok(false),
        "true" | "yes" | "y" | "x" => Ok(true),
        _ => parse_number(&value, row, field).map(|n| n != 0.0),
    }
}
