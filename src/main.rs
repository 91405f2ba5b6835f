//! shapeio - Read, check and rewrite MSTS/ORTS shape files

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = shapeio::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
