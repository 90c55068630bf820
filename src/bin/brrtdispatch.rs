fn main() {
    if let Err(err) = brrtdispatch::cli::run_cli() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
