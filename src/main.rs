//! threadboard utility - main entrypoint

use std::process::ExitCode;

fn main() -> ExitCode {
    threadboard::main(std::env::args_os())
}
