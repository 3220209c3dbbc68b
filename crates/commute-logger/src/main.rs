// The binary uses the library, not duplicate modules
use commute_logger::{Settings, run, setup_logging};
use std::process::ExitCode;

fn main() -> ExitCode {
    let settings = Settings::from_cli();
    let _logging = setup_logging(settings.trace_file.as_deref());

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(settings)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
