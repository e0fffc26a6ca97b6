use std::io::Write;

use clap::Parser;
use log::{error, info};

use volt2fea::{Args, Error};

fn run(args: &Args) -> Result<(), Error> {
    let fea = volt2fea::convert_path(&args.input, &args.options())?;
    std::fs::write(&args.output, fea).map_err(|source| Error::FileIo {
        path: args.output.clone(),
        source,
    })?;
    info!("wrote {}", args.output.display());
    Ok(())
}

fn main() {
    let args = Args::parse();
    env_logger::builder()
        .filter_level(args.log_level())
        .parse_default_env()
        .format(|buf, record| {
            writeln!(buf, "{}: {}", record.level(), record.args())
        })
        .init();

    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(1);
    }
}
