use std::process::ExitCode;

fn main() -> ExitCode {
    ticketry_cli::run()
}
