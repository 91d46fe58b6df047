//! Chhotu 交互式命令行
//!
//! 逐行读取 stdin 作为用户消息，打印回复；输入 quit / exit 退出。
//!
//! 用法: chhotu [--config <file>] [--restaurant <id>] [--owner <id>]（`--help` 查看说明）

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use chhotu::config::load_config;
use chhotu::core::new_session_id;
use chhotu::{ChatRequest, OrchestratorBuilder, ResponseType};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "chhotu")]
#[command(about = "Chhotu restaurant assistant (interactive REPL)")]
struct Cli {
    /// 额外的配置文件（覆盖 config/default.toml）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 当前餐厅 ID
    #[arg(short, long = "restaurant", default_value_t = 1)]
    restaurant_id: i64,

    /// 当前店主 ID
    #[arg(short, long = "owner", default_value_t = 1)]
    owner_id: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chhotu::observability::init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config).context("Failed to load config")?;
    let orchestrator = OrchestratorBuilder::new(cfg)
        .build()
        .context("Failed to build orchestrator")?;

    let session_id = new_session_id();
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(
            format!(
                "Chhotu ready ({} operations, restaurant {}). Type quit to leave.\n",
                orchestrator.registry().len(),
                cli.restaurant_id
            )
            .as_bytes(),
        )
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message.eq_ignore_ascii_case("quit") || message.eq_ignore_ascii_case("exit") {
            break;
        }

        let request = ChatRequest::new(cli.restaurant_id, cli.owner_id, message).with_session(&session_id);
        let response = orchestrator.handle(request).await;

        let mut out = format!("[{}] {}\n", response.kind, response.reply);
        if response.kind == ResponseType::AskUser {
            if let Some(missing) = response.missing_fields.as_ref().filter(|m| !m.is_empty()) {
                out.push_str(&format!("  (missing: {})\n", missing.join(", ")));
            }
        }
        stdout.write_all(out.as_bytes()).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_restaurant_and_owner_one() {
        let cli = Cli::try_parse_from(["chhotu"]).unwrap();
        assert_eq!(cli.restaurant_id, 1);
        assert_eq!(cli.owner_id, 1);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_accepts_equals_and_separate_values() {
        let cli = Cli::try_parse_from(["chhotu", "--restaurant=5", "--owner", "7", "--config", "local.toml"]).unwrap();
        assert_eq!(cli.restaurant_id, 5);
        assert_eq!(cli.owner_id, 7);
        assert_eq!(cli.config, Some(PathBuf::from("local.toml")));
    }

    #[test]
    fn test_help_is_not_a_value_error() {
        let err = Cli::try_parse_from(["chhotu", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_rejects_non_integer_restaurant() {
        assert!(Cli::try_parse_from(["chhotu", "--restaurant", "abc"]).is_err());
    }
}
