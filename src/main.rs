use std::process::ExitCode;

fn main() -> ExitCode {
    match landuse_es::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(exit_code = err.exit_code(), "{err}");
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
