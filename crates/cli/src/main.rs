fn main() {
    if let Err(error) = calcxml_cli::run() {
        // Tracing is initialized inside run() after argument parsing.
        let message = format!("{error:#}");
        tracing::error!(error = %message, "CLI execution failed");
        std::process::exit(1);
    }
}
