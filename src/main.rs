use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use gap_finder::utils::logging;
use gap_finder::{App, Config};

/// PubMed 荟萃分析知识缺口挖掘
#[derive(Parser, Debug)]
#[command(name = "gap-finder", version, about)]
struct Cli {
    /// 显示详细日志
    #[arg(short, long, global = true)]
    verbose: bool,

    /// 结果表路径
    #[arg(long, global = true)]
    csv_path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 从研究主题开始迭代检索
    Run {
        /// 研究主题
        #[arg(short, long)]
        topic: String,
        /// 最大迭代次数（5-100）
        #[arg(short, long)]
        max_iterations: Option<usize>,
        /// 导出目录
        #[arg(long)]
        export_dir: Option<String>,
    },
    /// 把结果表导出为 CSV 和 JSON
    Export {
        /// 用于命名导出文件的主题
        #[arg(short, long)]
        topic: String,
        #[arg(long)]
        export_dir: Option<String>,
    },
    /// 删除结果表
    Reset,
    /// 列出高分主题
    Topics,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置，命令行参数最后覆盖
    let mut config = Config::load()?;
    config.verbose_logging |= cli.verbose;
    if let Some(csv_path) = cli.csv_path {
        config.csv_path = csv_path;
    }

    logging::init(config.verbose_logging);

    match cli.command {
        Command::Run {
            topic,
            max_iterations,
            export_dir,
        } => {
            if let Some(n) = max_iterations {
                config.max_iterations = n;
            }
            if let Some(dir) = export_dir {
                config.export_dir = dir;
            }
            let max_iterations = config.max_iterations;
            let app = App::initialize(config)?;

            // Ctrl-C 只设置停止标记，当前这一轮会完整跑完
            let finder = app.finder();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    finder.request_stop();
                }
            });

            let outcome = app.run(&topic, max_iterations).await?;
            if !outcome.completed_normally() {
                error!("运行未正常完成: {}", outcome.terminal);
            }
        }
        Command::Export { topic, export_dir } => {
            if let Some(dir) = export_dir {
                config.export_dir = dir;
            }
            let app = App::initialize(config)?;
            let (csv, json) = app.export(&topic).await?;
            info!("✓ CSV: {}", csv.display());
            info!("✓ JSON: {}", json.display());
        }
        Command::Reset => {
            App::initialize(config)?.reset().await?;
        }
        Command::Topics => {
            App::initialize(config)?.topics().await?;
        }
    }

    Ok(())
}
