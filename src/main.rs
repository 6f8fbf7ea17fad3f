// Tue Jan 13 2026 - Alex

use colored::Colorize;

fn main() {
    if let Err(e) = avm_inspector::ui::cli::run() {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
