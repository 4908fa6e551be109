//! Main application entry point (native).

#[cfg(feature = "native")]
fn main() {
    use graphmaster_app::CliError;

    env_logger::init();

    let argv: Vec<String> = std::env::args().collect();
    let args = match graphmaster_app::parse_args(&argv) {
        Ok(args) => args,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    log::info!("Starting GraphMaster");
    if let Err(err) = graphmaster_app::run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[cfg(not(feature = "native"))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}
