use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use clap::error::ErrorKind;
use clap::Parser;
use log::info;

use ext2_dump::error::{EXIT_IO, EXIT_OPEN, EXIT_USAGE};
use ext2_dump::{dump, Ext2};

mod logger;

/// Dump the metadata of an ext2 image as CSV records
#[derive(Parser, Debug)]
#[command(name = "ext2-dump", version)]
struct Cli {
    /// Path to the ext2 image file
    image: PathBuf,

    /// Log more to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => {
                let _ = err.print();
                process::exit(EXIT_USAGE);
            }
        },
    };

    let env_level = env::var(logger::LOG_ENV).ok();
    logger::init(logger::level(cli.verbose, env_level.as_deref()));

    process::exit(run(&cli));
}

fn run(cli: &Cli) -> i32 {
    let file = match File::open(&cli.image) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("cannot open '{}': {}", cli.image.display(), err);
            return EXIT_OPEN;
        }
    };
    info!("dumping {}", cli.image.display());

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = Ext2::new(file).and_then(|fs| dump(&fs, &mut out));
    let flushed = out.flush();

    match (result, flushed) {
        (Ok(()), Ok(())) => 0,
        (Err(err), _) => {
            eprintln!("{}: {}", cli.image.display(), err);
            err.exit_code()
        }
        (Ok(()), Err(err)) => {
            eprintln!("failed to write records: {}", err);
            EXIT_IO
        }
    }
}
