use iobench::cli::{self, GenCli, Parsed};
use iobench::error;
use iobench::params::sorted_breakpoints;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match cli::parse_args::<GenCli, _, _>(std::env::args_os()) {
        Ok(Parsed::Run(cli)) => cli,
        Ok(Parsed::Exit) => return ExitCode::SUCCESS,
        Err(code) => return ExitCode::from(code as u8),
    };
    cli::init_logging(cli.verbose);

    let result = cli
        .io_range()
        .and_then(|range| sorted_breakpoints(&range, cli.max_points))
        .and_then(|io_sizes| {
            let strides = cli
                .stride_range()
                .and_then(|range| sorted_breakpoints(&range, cli.max_points))?;
            Ok((io_sizes, strides))
        });

    match result {
        Ok((io_sizes, strides)) => match print_sections(&io_sizes, &strides) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("Error: {}", err);
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            eprintln!("{}", error::user_friendly_message(&err));
            ExitCode::from(error::exit_code(&err) as u8)
        }
    }
}

fn print_sections(io_sizes: &[i64], strides: &[i64]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    writeln!(out, "IO Sizes:")?;
    for size in io_sizes {
        writeln!(out, "{}", size)?;
    }

    writeln!(out, "\nStrides:")?;
    for stride in strides {
        writeln!(out, "{}", stride)?;
    }
    out.flush()
}
