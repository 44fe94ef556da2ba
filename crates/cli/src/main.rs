use std::process::ExitCode;

fn main() -> ExitCode {
    comrade_cli::run()
}
