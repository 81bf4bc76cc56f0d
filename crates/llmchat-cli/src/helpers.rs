//! Shared CLI helpers: reply printing, banner, status marks.

use std::io::Write;

use colored::Colorize;

/// Prints a reply as it arrives, header first.
pub struct ReplyPrinter {
    name: String,
    started: bool,
}

impl ReplyPrinter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            started: false,
        }
    }

    /// Print one fragment; the first one clears the "thinking" line.
    pub fn fragment(&mut self, text: &str) {
        if !self.started {
            clear_thinking();
            println!();
            println!("{}", format!("🤖 {}", self.name).cyan().bold());
            self.started = true;
        }
        print!("{text}");
        let _ = std::io::stdout().flush();
    }

    /// End the reply (or the "thinking" line when nothing arrived).
    pub fn finish(&mut self) {
        if self.started {
            println!();
            println!();
        } else {
            clear_thinking();
        }
        self.started = false;
    }
}

/// Print the banner shown at REPL start.
pub fn print_banner(provider: &str, model: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "💬 llm-chat".cyan().bold(), version.dimmed());
    println!("{}", format!("{provider} · {model}").dimmed());
    println!(
        "{}",
        "Type a message, \"/clear\" to reset the conversation, or \"exit\" to quit.".dimmed()
    );
    println!();
}

/// Print a "thinking" spinner placeholder.
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

/// Green check or red cross.
pub fn mark(ok: bool) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

/// Show only the last four characters of a secret.
pub fn mask_key(key: &str) -> String {
    let key = key.trim();
    let count = key.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = key.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(4), tail)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
