// ==========================================
// 上部完井管柱配管系统 - 配置项
// ==========================================
// 职责: 排布参数 + 各数据表的读取布局
// 红线: 迭代上限不可配置
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::domain::assembly::DEFAULT_CRITICAL_MARGIN;
use crate::engine::planner::DEFAULT_TERMINAL_TOLERANCE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 平均管长默认值 (m)
pub const DEFAULT_AVERAGE_PIPE_LENGTH: f64 = 11.5;

/// 配置文件名
const CONFIG_FILE_NAME: &str = "config.json";

/// 配置目录名
const CONFIG_DIR_NAME: &str = "completion-tally";

// ==========================================
// PlanningSettings - 排布参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningSettings {
    /// 关键点避让套管接箍余量 (m)
    pub critical_margin: f64,
    /// 末端总成放置后允许的长度不足 (m)
    pub terminal_tolerance: f64,
    /// 步骤1 使用的平均管长 (m)
    pub average_pipe_length: f64,
}

impl Default for PlanningSettings {
    fn default() -> Self {
        Self {
            critical_margin: DEFAULT_CRITICAL_MARGIN,
            terminal_tolerance: DEFAULT_TERMINAL_TOLERANCE,
            average_pipe_length: DEFAULT_AVERAGE_PIPE_LENGTH,
        }
    }
}

// ==========================================
// 数据表布局
// ==========================================

/// 数据行范围（表头下方第 1 行记为 1，含两端）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub first: usize,
    #[serde(default)]
    pub last: Option<usize>,
}

impl Default for RowRange {
    fn default() -> Self {
        Self {
            first: 1,
            last: None,
        }
    }
}

/// 管柱清单（甲板清单 / 短节清单）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TallySource {
    pub path: PathBuf,
    #[serde(default)]
    pub sheet: Option<String>,
    pub id_column: String,
    pub length_column: String,
    #[serde(default)]
    pub rows: RowRange,
}

/// 已组装立柱（按管号列依次分组）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandSource {
    pub path: PathBuf,
    #[serde(default)]
    pub sheet: Option<String>,
    pub id_column: String,
    #[serde(default)]
    pub rows: RowRange,
}

/// 总成表（每行前 8 列）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblySource {
    pub path: PathBuf,
    #[serde(default)]
    pub sheet: Option<String>,
    #[serde(default)]
    pub rows: RowRange,
}

/// 套管清单（接箍深度列）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasingSource {
    pub path: PathBuf,
    #[serde(default)]
    pub sheet: Option<String>,
    pub column: String,
    #[serde(default)]
    pub rows: RowRange,
}

/// 导入布局
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportLayout {
    pub deck_tally: Option<TallySource>,
    pub pup_tally: Option<TallySource>,
    pub triples: Option<StandSource>,
    pub doubles: Option<StandSource>,
    pub assemblies: Option<AssemblySource>,
    pub casing: Vec<CasingSource>,
}

impl ImportLayout {
    fn paths_mut(&mut self) -> Vec<&mut PathBuf> {
        let mut paths = Vec::new();
        if let Some(source) = self.deck_tally.as_mut() {
            paths.push(&mut source.path);
        }
        if let Some(source) = self.pup_tally.as_mut() {
            paths.push(&mut source.path);
        }
        if let Some(source) = self.triples.as_mut() {
            paths.push(&mut source.path);
        }
        if let Some(source) = self.doubles.as_mut() {
            paths.push(&mut source.path);
        }
        if let Some(source) = self.assemblies.as_mut() {
            paths.push(&mut source.path);
        }
        for source in self.casing.iter_mut() {
            paths.push(&mut source.path);
        }
        paths
    }

    fn ranges(&self) -> Vec<(&'static str, RowRange)> {
        let mut ranges = Vec::new();
        if let Some(source) = &self.deck_tally {
            ranges.push(("import.deck_tally.rows", source.rows));
        }
        if let Some(source) = &self.pup_tally {
            ranges.push(("import.pup_tally.rows", source.rows));
        }
        if let Some(source) = &self.triples {
            ranges.push(("import.triples.rows", source.rows));
        }
        if let Some(source) = &self.doubles {
            ranges.push(("import.doubles.rows", source.rows));
        }
        if let Some(source) = &self.assemblies {
            ranges.push(("import.assemblies.rows", source.rows));
        }
        for source in &self.casing {
            ranges.push(("import.casing.rows", source.rows));
        }
        ranges
    }
}

// ==========================================
// TallyConfig - 顶层配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    pub planning: PlanningSettings,
    pub import: ImportLayout,
}

impl TallyConfig {
    /// 默认配置文件路径（用户配置目录下）
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// 从 JSON 文件加载并校验
    ///
    /// 布局中的相对路径按配置文件所在目录解析
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: TallyConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;

        info!(path = %path.display(), "配置加载完成");
        Ok(config)
    }

    /// 加载配置：显式路径优先，其次默认路径，均不存在时使用默认值
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(default) if default.exists() => Self::load(&default),
            _ => {
                debug!("未找到配置文件，使用默认配置");
                Ok(Self::default())
            }
        }
    }

    /// 相对路径改为相对 base 目录
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in self.import.paths_mut() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// 校验配置项
    pub fn validate(&self) -> ConfigResult<()> {
        let planning = &self.planning;
        let positives = [
            ("planning.critical_margin", planning.critical_margin),
            ("planning.terminal_tolerance", planning.terminal_tolerance),
            ("planning.average_pipe_length", planning.average_pipe_length),
        ];
        for (key, value) in positives {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::invalid(key, format!("必须为正数，实际 {value}")));
            }
        }

        for (key, range) in self.import.ranges() {
            if range.first == 0 {
                return Err(ConfigError::invalid(key, "行号从 1 开始"));
            }
            if let Some(last) = range.last {
                if last < range.first {
                    return Err(ConfigError::invalid(
                        key,
                        format!("结束行 {last} 小于起始行 {}", range.first),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = TallyConfig::default();
        assert_eq!(config.planning.critical_margin, 1.5);
        assert_eq!(config.planning.terminal_tolerance, 5.0);
        assert_eq!(config.planning.average_pipe_length, 11.5);
        assert!(config.import.deck_tally.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TallyConfig =
            serde_json::from_str(r#"{"planning": {"critical_margin": 2.0}}"#).unwrap();
        assert_eq!(config.planning.critical_margin, 2.0);
        assert_eq!(config.planning.terminal_tolerance, 5.0);
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "import": {{
                    "deck_tally": {{
                        "path": "tally.csv",
                        "id_column": "A",
                        "length_column": "C",
                        "rows": {{"first": 1, "last": 180}}
                    }}
                }}
            }}"#
        )
        .unwrap();

        let config = TallyConfig::load(file.path()).unwrap();
        let deck = config.import.deck_tally.unwrap();
        let base = file.path().parent().unwrap();
        assert_eq!(deck.path, base.join("tally.csv"));
        assert_eq!(deck.rows.last, Some(180));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = TallyConfig::default();
        config.planning.terminal_tolerance = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));

        let mut config = TallyConfig::default();
        config.import.casing.push(CasingSource {
            path: PathBuf::from("casing.csv"),
            sheet: None,
            column: "B".to_string(),
            rows: RowRange {
                first: 10,
                last: Some(5),
            },
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = TallyConfig::load(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
