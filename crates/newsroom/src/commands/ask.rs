//! Ask command - one-shot question answered in-process.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use console::Style;
use futures::StreamExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use newsroom_agent::{AgentMessage, NewsItem, StreamChunk, TurnContext};
use newsroom_llm::ModelName;

use super::{Context, build_catalog};

/// Arguments for the ask command.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question to ask
    #[arg(required = true)]
    pub question: String,

    /// Model to use (gpt-4o, gpt-4o-mini, llama3.2:latest)
    #[arg(short, long)]
    pub model: Option<ModelName>,

    /// Print the answer as it is generated
    #[arg(short, long)]
    pub stream: bool,

    /// Give up after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Run the ask command.
pub async fn run(args: AskArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let catalog = build_catalog(&loaded.config)?;
    let agent = catalog.get(args.model)?.clone();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut turn = TurnContext::new().with_cancel(cancel);
    if let Some(secs) = args.timeout {
        turn = turn.with_timeout(Duration::from_secs(secs));
    }

    let dim = Style::new().dim();
    if ctx.verbose && !ctx.json_output {
        eprintln!("{}", dim.apply_to(format!("Model: {}", agent.model())));
    }

    let messages = vec![AgentMessage::user(args.question)];

    if args.stream && !ctx.json_output {
        let mut stream = agent.stream(messages, turn);
        let mut news = Vec::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                StreamChunk::News(items) => {
                    eprintln!("{}", dim.apply_to(format!("[retrieved {} articles]", items.len())));
                    news = items;
                }
                StreamChunk::Chunk(text) => {
                    print!("{}", text);
                    std::io::stdout().flush()?;
                }
                StreamChunk::Error(e) => {
                    let red = Style::new().red();
                    eprintln!();
                    eprintln!("{} {}", red.apply_to("Error:"), e);
                    return Err(anyhow::anyhow!(e));
                }
            }
        }
        println!();
        print_news(&news);
        return Ok(());
    }

    let state = agent.run(messages, &turn).await?;
    let answer = state.final_answer().unwrap_or_default();
    let news = state.news().unwrap_or_default();

    if ctx.json_output {
        let output = json!({
            "model": agent.model(),
            "answer": answer,
            "news": news,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", answer);
        print_news(&news);
    }
    Ok(())
}

fn print_news(news: &[NewsItem]) {
    if news.is_empty() {
        return;
    }
    let bold = Style::new().bold();
    let dim = Style::new().dim();
    println!();
    println!("{}", bold.apply_to("Sources"));
    for item in news {
        println!("  {}", item.title);
        println!("  {}", dim.apply_to(&item.link));
    }
}
