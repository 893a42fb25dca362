//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the jarvis-server CLI.

use crate::types::Source;
use owo_colors::OwoColorize;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    pub fn banner(&self) {
        if self.colored {
            println!(
                "\n   {} {}\n   {}\n",
                "JARVIS".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed(),
                "Knowledge-base assistant".bright_white()
            );
        } else {
            println!(
                "\n   JARVIS v{}\n   Knowledge-base assistant\n",
                env!("CARGO_PKG_VERSION")
            );
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a step message (for multi-step operations)
    pub fn step(&self, step_num: usize, total: usize, message: &str) {
        if self.colored {
            println!(
                "  {} {}",
                format!("[{}/{}]", step_num, total).dimmed(),
                message.bright_white()
            );
        } else {
            println!("  [{}/{}] {}", step_num, total, message);
        }
    }

    /// Report one ingested document
    pub fn ingested(&self, source: &str, chunks: usize) {
        if self.colored {
            println!(
                "  {} {} {}",
                "✓".green().bold(),
                source.bright_white(),
                format!("({} chunks)", chunks).dimmed()
            );
        } else {
            println!("  [INGESTED] {} ({} chunks)", source, chunks);
        }
    }

    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a multi-line answer, indented
    pub fn answer(&self, text: &str) {
        for line in text.lines() {
            if self.colored {
                println!("    {}", line.bright_white());
            } else {
                println!("    {}", line);
            }
        }
    }

    /// Print one cited source
    pub fn source(&self, rank: usize, source: &Source) {
        let label = format!("{} #{}", source.source, source.chunk_id);
        let score = format!("{:.3}", source.score);
        if self.colored {
            println!(
                "    {} {} {}",
                format!("{}.", rank).dimmed(),
                label.cyan(),
                score.dimmed()
            );
        } else {
            println!("    {}. {} {}", rank, label, score);
        }
    }

    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print raw text, such as rendered configuration
    pub fn raw(&self, text: &str) {
        println!("{}", text);
    }

    pub fn newline(&self) {
        println!();
    }
}
