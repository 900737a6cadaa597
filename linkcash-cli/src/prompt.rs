//! Line-oriented terminal input shared by the flow loop and the card widget.
//!
//! Stdin is read on a dedicated thread and forwarded line by line, so a
//! pending question never holds up runtime shutdown.

use std::io::{BufRead, Write};

use tokio::sync::{Mutex, mpsc};

pub struct Prompt {
    lines: Mutex<mpsc::Receiver<String>>,
}

impl Prompt {
    pub fn stdin() -> Self {
        let (tx, rx) = mpsc::channel(16);
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to read from stdin: {}", e);
                        break;
                    }
                }
            }
        });
        Self {
            lines: Mutex::new(rx),
        }
    }

    /// Answers `lines` in order, then behaves like a closed stdin.
    #[cfg(test)]
    pub fn scripted(lines: &[&str]) -> Self {
        let (tx, rx) = mpsc::channel(lines.len().max(1));
        for line in lines {
            let _ = tx.try_send((*line).to_string());
        }
        Self {
            lines: Mutex::new(rx),
        }
    }

    /// Print `question` and read one trimmed line. `None` on end of input.
    pub async fn ask(&self, question: &str) -> Option<String> {
        let mut lines = self.lines.lock().await;
        print!("{question} ");
        let _ = std::io::stdout().flush();
        lines.recv().await.map(|line| line.trim().to_string())
    }

    /// Yes/no question. Empty input counts as yes, end of input as no.
    pub async fn confirm(&self, question: &str) -> bool {
        self.ask(&format!("{question} [Y/n]"))
            .await
            .is_some_and(|answer| parse_yes(&answer))
    }
}

fn parse_yes(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "" | "y" | "yes")
}
