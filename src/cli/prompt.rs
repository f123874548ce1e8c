//! Yes/no confirmation before the deployment is touched.

use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Source of the operator's go-ahead.
#[async_trait]
pub trait Prompt: Send {
    /// Ask `question`; `true` means proceed.
    async fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// Interactive prompt on the process's stdin/stdout.
#[derive(Debug, Default)]
pub struct StdinPrompt;

#[async_trait]
impl Prompt for StdinPrompt {
    async fn confirm(&mut self, question: &str) -> Result<bool> {
        let mut reader = BufReader::new(tokio::io::stdin());
        let mut writer = tokio::io::stdout();
        ask_yes_no(&mut reader, &mut writer, question).await
    }
}

/// Answers yes without asking, for `--yes`.
#[derive(Debug, Default)]
pub struct AssumeYes;

#[async_trait]
impl Prompt for AssumeYes {
    async fn confirm(&mut self, question: &str) -> Result<bool> {
        tracing::debug!("Auto-confirming: {question}");
        Ok(true)
    }
}

/// Ask until the answer is `y` or `n` (any case, surrounding space ignored).
///
/// End of input counts as `n`.
pub async fn ask_yes_no<R, W>(reader: &mut R, writer: &mut W, question: &str) -> Result<bool>
where
    R: AsyncBufRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut answer = String::new();

    loop {
        let prompt = format!("{} {} ", question, "[y/n]:".bold());
        writer.write_all(prompt.as_bytes()).await?;
        writer.flush().await?;

        answer.clear();
        if reader.read_line(&mut answer).await? == 0 {
            writer.write_all(b"\n").await?;
            writer.flush().await?;
            tracing::debug!("Input closed before an answer, treating as no");
            return Ok(false);
        }

        match answer.trim().to_lowercase().as_str() {
            "y" => return Ok(true),
            "n" => return Ok(false),
            other => tracing::debug!("Unrecognised answer '{other}', asking again"),
        }
    }
}
