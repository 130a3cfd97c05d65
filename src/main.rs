//! Career Agent 控制台
//!
//! 入口：初始化日志、加载配置、构建 Agent 组件，逐行读取标准输入并打印回复、置信度与修订次数。

use anyhow::Context;
use career_agent::agent::{create_agent_components, AgentRuntime};
use career_agent::config::load_config;
use career_agent::core::AgentError;
use career_agent::observability;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(Into::into);
    let cfg = load_config(config_path).context("Failed to load config")?;
    let runtime = AgentRuntime::new(create_agent_components(&cfg));

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout.write_all(b"Career assistant ready. Type a message, or 'exit' to quit.\n> ").await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        match runtime.process_message(None, line).await {
            Ok(outcome) => {
                let text = format!(
                    "\n{}\n\n[confidence {:.2} | revisions {}]\n> ",
                    outcome.reply,
                    outcome.confidence,
                    outcome.evaluation_log.len().saturating_sub(1)
                );
                stdout.write_all(text.as_bytes()).await?;
            }
            Err(AgentError::EmptyMessage) => stdout.write_all(b"> ").await?,
            Err(e) => {
                tracing::error!(error = %e, "failed to handle message");
                stdout.write_all(format!("Error: {}\n> ", e).as_bytes()).await?;
            }
        }
        stdout.flush().await?;
    }
    Ok(())
}
