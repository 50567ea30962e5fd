fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let rom_path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!(
                "No ROM path provided.\n\
                 Usage: dotmatrix path/to/game.gb"
            );
            std::process::exit(1);
        }
    };

    if let Err(err) = dotmatrix::run(&rom_path) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
