// Terminal UI utilities
// Shared by every command for consistent, colored console output.

use colored::Colorize;

use crate::services::Severity;

pub fn print_header(title: &str) {
    println!();
    println!(
        "{}",
        "╔════════════════════════════════════════════════════════════╗".bright_blue()
    );
    println!("{}", format!("║  {:<58}║", title).bright_blue());
    println!(
        "{}",
        "╚════════════════════════════════════════════════════════════╝".bright_blue()
    );
    println!();
}

pub fn print_success(message: &str) {
    println!("{}", format!("✅ {}", message).bright_green().bold());
}

pub fn print_error(message: &str) {
    eprintln!("{}", format!("❌ {}", message).bright_red().bold());
}

pub fn print_info(message: &str) {
    println!("{}", format!("ℹ️  {}", message).bright_cyan());
}

pub fn print_warning(message: &str) {
    println!("{}", format!("⚠️  {}", message).bright_yellow());
}

/// One connectivity finding, prefixed by its severity
pub fn print_finding(severity: Severity, service: &str, message: &str) {
    let line = format!("[{}] {}: {}", severity, service, message);
    match severity {
        Severity::Error => print_error(&line),
        Severity::Warning => print_warning(&line),
        Severity::Notice => print_info(&line),
    }
}
