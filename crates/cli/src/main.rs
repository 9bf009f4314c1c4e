use std::process::ExitCode;

fn main() -> ExitCode {
    repfuel_cli::run()
}
