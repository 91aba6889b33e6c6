use ruby_memcheck::cli;

fn main() {
    // Logging is initialised inside process_cli, once --log-level is known
    let code = match cli::process_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ruby-memcheck: error: {e:#}");
            log::error!("{e:#}");
            1
        }
    };
    log::Log::flush(log::logger());

    // The configuration (and its XML temp file) was dropped inside
    // process_cli, so exiting here skips no cleanup.
    std::process::exit(code);
}
