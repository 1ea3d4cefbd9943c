use iobench::bench::IoEngine;
use iobench::cli::{self, BenchCli, Parsed};
use iobench::error::{self, RetryConfig};
use iobench::IoBenchError;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match cli::parse_args::<BenchCli, _, _>(std::env::args_os()) {
        Ok(Parsed::Run(cli)) => cli,
        Ok(Parsed::Exit) => return ExitCode::SUCCESS,
        Err(code) => return ExitCode::from(code as u8),
    };
    cli::init_logging(cli.verbose);

    match run(&cli) {
        Ok(line) => {
            println!("{}", line);
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::debug!("run failed: {:?}", err);
            eprintln!("{}", error::user_friendly_message(&err));
            if matches!(err, IoBenchError::InvalidArgument(_)) {
                eprintln!("Try '{} --help' for usage.", iobench::APP_NAME);
            }
            ExitCode::from(error::exit_code(&err) as u8)
        }
    }
}

fn run(cli: &BenchCli) -> iobench::Result<String> {
    let request = cli.to_request()?;
    let engine = IoEngine::new();
    let retry = RetryConfig::default().with_max_attempts(cli.attempts);

    let measurement = error::retry(|| engine.run(&request), &retry)?;
    cli.format.render(&request, &measurement)
}
