use console::style;

use crate::monitor::HealthStatus;

/// Styled terminal output for command handlers
pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new() -> Self {
        Self { quiet: false }
    }

    /// Suppress everything but errors and raw payloads
    pub fn quiet(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✓").green(), message);
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    pub fn header(&self, message: &str) {
        if !self.quiet {
            println!("\n{}", style(message).bold().underlined());
        }
    }

    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        if !self.quiet {
            println!("  {:<12} {}", style(label).dim(), value);
        }
    }

    pub fn health(&self, service: &str, status: HealthStatus, details: Option<&str>) {
        if self.quiet {
            return;
        }
        let badge = match status {
            HealthStatus::Healthy => style("●").green(),
            HealthStatus::Degraded => style("●").yellow(),
            HealthStatus::Unhealthy => style("●").red(),
        };
        match details {
            Some(d) => println!("{} {:<12} {:<10} {}", badge, service, status, style(d).dim()),
            None => println!("{} {:<12} {}", badge, service, status),
        }
    }

    /// Unstyled payload (generated code, JSON); printed even when quiet
    pub fn raw(&self, content: &str) {
        println!("{}", content);
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
