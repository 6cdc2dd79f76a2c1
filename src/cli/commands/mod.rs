//! CLI command implementations

pub mod flash;
pub mod list;
pub mod update;

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

use crate::models::{MessageKind, TerminalMessage};

/// Spawn a task that renders terminal messages to stdout
///
/// Progress and partial updates overwrite the current line the way esptool
/// renders its own progress; everything else gets its own line.
pub fn spawn_printer() -> (UnboundedSender<TerminalMessage>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<TerminalMessage>();

    let handle = tokio::spawn(async move {
        use std::io::Write;
        let mut overwriting = false;

        while let Some(msg) = rx.recv().await {
            match msg.kind {
                MessageKind::Progress | MessageKind::Partial => {
                    print!("\r{}", msg.message);
                    let _ = std::io::stdout().flush();
                    overwriting = true;
                }
                kind => {
                    if overwriting {
                        println!();
                        overwriting = false;
                    }
                    match kind {
                        MessageKind::Error => println!("❌ {}", msg.message),
                        MessageKind::Success => println!("✅ {}", msg.message),
                        MessageKind::Command => println!("🔧 {}", msg.message),
                        MessageKind::Info => println!("ℹ️  {}", msg.message),
                        _ => println!("{}", msg.message),
                    }
                }
            }
        }

        if overwriting {
            println!();
        }
    });

    (tx, handle)
}
