fn main() {
    if let Err(err) = bechdel_insights::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
