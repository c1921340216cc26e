fn main() {
    if let Err(err) = supply_indicators::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
