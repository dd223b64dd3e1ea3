fn main() {
    if let Err(err) = sgaudit::cli::run() {
        sgaudit::ui::eprintln_error(&err);
        std::process::exit(sgaudit::exit::exit_code(&err));
    }
}
