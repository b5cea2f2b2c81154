//! Severity-tagged console output used across the crate

use colored::Colorize;

pub fn info(msg: &str) {
    println!("{} {}", "[INFO]".blue(), msg);
}

pub fn success(msg: &str) {
    println!("{} {}", "[OK]".green(), msg);
}

pub fn warn(msg: &str) {
    println!("{} {}", "[WARN]".yellow(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "[ERROR]".red(), msg);
}
