//! Glow 命令行入口
//!
//! - `glow start --profile '{"skinType":"oily"}' [--image face.jpg]`
//! - `glow continue --thread <id> --message "..."`
//! - `glow history --thread <id>`
//!
//! 结果以 JSON 打印到 stdout，日志走 stderr。

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use glow::config::load_config;
use glow::context::UserProfile;
use glow::{observability, ConversationService};

#[derive(Parser)]
#[command(name = "glow", version, about = "Stateful skincare advisor conversations")]
struct Cli {
    /// 额外的 TOML 配置文件（覆盖 config/default.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 开始新对话，输出 thread_id 与首条回复
    Start {
        /// 用户画像 JSON；以 @ 开头时从文件读取
        #[arg(long)]
        profile: String,
        /// 图片文件（png / jpeg / webp / gif）
        #[arg(long)]
        image: Option<PathBuf>,
        /// 图片 MIME，省略时按文件头识别
        #[arg(long)]
        mime: Option<String>,
    },
    /// 在已有线程上追加一条用户消息
    Continue {
        #[arg(long)]
        thread: String,
        #[arg(long)]
        message: String,
    },
    /// 打印线程已提交的历史
    History {
        #[arg(long)]
        thread: String,
    },
}

fn read_profile(arg: &str) -> anyhow::Result<UserProfile> {
    let raw = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile file {}", path))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&raw).context("Profile must be a JSON object")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(cli.config.clone()).context("Failed to load config")?;
    observability::init(cfg.app.json_logs);

    let service = ConversationService::from_config(&cfg)
        .await
        .context("Failed to build service")?;

    let output = match cli.command {
        Command::Start {
            profile,
            image,
            mime,
        } => {
            let profile = read_profile(&profile)?;
            let image = match image {
                Some(path) => {
                    let bytes = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("Failed to read image {}", path.display()))?;
                    Some(service.image_from_bytes(bytes, mime.as_deref())?)
                }
                None => None,
            };
            let started = service.start_conversation(&profile, image.as_ref()).await?;
            serde_json::to_string_pretty(&started)?
        }
        Command::Continue { thread, message } => {
            let reply = service.continue_conversation(&thread, &message).await?;
            serde_json::to_string_pretty(&reply)?
        }
        Command::History { thread } => {
            let messages = service.history(&thread).await?;
            serde_json::to_string_pretty(&messages)?
        }
    };

    println!("{}", output);
    Ok(())
}
