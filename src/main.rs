fn main() {
    if let Err(err) = reelfeed_lib::run() {
        eprintln!("reelfeed: {err:#}");
        std::process::exit(1);
    }
}
