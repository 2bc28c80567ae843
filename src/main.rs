// ==========================================
// 上部完井管柱配管系统 - 命令行入口
// ==========================================
// 用法: completion-tally [--depth <m>] [--config <path>] [--json]
// ==========================================

use anyhow::Context;
use clap::Parser;
use completion_tally::{logging, TallyConfig, TallyImporter, TallyOrchestrator, TallyReport};
use std::path::PathBuf;

/// 默认井深 (m)
const DEFAULT_DEPTH: f64 = 2247.0;

#[derive(Parser)]
#[command(
    name = "completion-tally",
    version,
    about = "Upper completion tally: stand requirements and running order"
)]
struct Cli {
    /// Well depth in meters
    #[arg(long, default_value_t = DEFAULT_DEPTH)]
    depth: f64,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }

    tracing::info!(
        version = completion_tally::VERSION,
        depth = cli.depth,
        "{}",
        completion_tally::APP_NAME
    );

    let config = TallyConfig::load_or_default(cli.config.as_deref()).context("加载配置失败")?;

    let inputs = TallyImporter::new()
        .import_all(&config.import)
        .context("导入管柱数据失败")?;

    let outcome = TallyOrchestrator::new(config.planning.clone())
        .run(cli.depth, &inputs)
        .context("配管计算失败")?;

    let report = TallyReport::from_outcome(&outcome);
    if cli.json {
        println!("{}", report.to_json().context("报告序列化失败")?);
    } else {
        print!("{}", report.render());
    }
    Ok(())
}
