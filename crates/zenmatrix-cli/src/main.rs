fn main() {
    if let Err(err) = zenmatrix_core::run(std::env::args_os().collect()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
