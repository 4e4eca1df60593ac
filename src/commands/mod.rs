//! CLI command implementations, one module per subcommand.

pub mod add;
pub mod clean;
pub mod commit;
pub mod diff;
pub mod encrypt;
pub mod init;
pub mod list;
pub mod passwd;
pub mod restore;
pub mod unmanage;
pub mod update;

use colored::Colorize;

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}
