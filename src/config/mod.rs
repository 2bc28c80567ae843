// ==========================================
// 上部完井管柱配管系统 - 配置层
// ==========================================
// 职责: 排布参数与导入布局的加载、校验
// 存储: JSON 文件（默认位于用户配置目录）
// ==========================================

pub mod error;
pub mod tally_config;

pub use error::{ConfigError, ConfigResult};
pub use tally_config::{
    AssemblySource, CasingSource, ImportLayout, PlanningSettings, RowRange, StandSource,
    TallyConfig, TallySource,
};
