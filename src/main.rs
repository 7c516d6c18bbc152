fn main() {
    if let Err(err) = query_bridge::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
