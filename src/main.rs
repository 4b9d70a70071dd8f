// Mon Oct 19 2026 - Alex

fn main() {
    if let Err(e) = memhook::ui::cli::run() {
        memhook::ui::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
