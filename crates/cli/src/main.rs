use std::process::ExitCode;

fn main() -> ExitCode {
    titledesk_cli::run()
}
