use crate::core::message::{ChatMessage, Role};
use colored::*;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.chars().count()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_message(message: &ChatMessage) {
    let label = match message.role() {
        Role::System => "system".magenta().bold(),
        Role::User => "user".yellow().bold(),
        Role::Assistant => "assistant".green().bold(),
    };
    println!("{}: {}", label, message.content());
}
