use std::process::ExitCode;

fn main() -> ExitCode {
    match cuebridged::run_bridge() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(target: "cuebridged::process", %error, "bridge exited with an error");
            ExitCode::FAILURE
        }
    }
}
