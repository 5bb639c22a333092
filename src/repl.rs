//! Interactive question loop for `sales chat`.
//!
//! Reads one question per line, answers it, and prints the answer followed
//! by its sources as pretty JSON. `exit`/`quit` (any case) or end of input
//! ends the session. A failed question is reported and the loop goes on.

use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::agent::{Answer, SalesAgent};

pub const PROMPT: &str = "QUESTION > ";

pub fn is_exit_command(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

/// Print an answer block: `--- ANSWER ---`, the text, `--- SOURCES ---`, JSON.
pub fn write_answer<W: Write>(writer: &mut W, answer: &Answer) -> Result<()> {
    writeln!(writer, "\n--- ANSWER ---")?;
    writeln!(writer, "{}", answer.text)?;
    writeln!(writer, "\n--- SOURCES ---")?;
    writeln!(writer, "{}", serde_json::to_string_pretty(&answer.sources)?)?;
    writeln!(writer)?;
    Ok(())
}

pub async fn run_repl<R, W>(agent: &SalesAgent<'_>, mut reader: R, writer: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(writer, "Agent ready. Type a question (type 'exit' to quit).")?;

    let mut line = String::new();
    loop {
        write!(writer, "{}", PROMPT)?;
        writer.flush()?;

        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            writeln!(writer)?;
            break;
        }

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit_command(question) {
            break;
        }

        match agent.answer(question).await {
            Ok(answer) => write_answer(writer, &answer)?,
            Err(e) => {
                tracing::warn!("question failed: {:#}", e);
                writeln!(writer, "Error: {:#}\n", e)?;
            }
        }
    }

    Ok(())
}
