//! Binary entrypoint for the echo chat server.

use std::process::ExitCode;

use echo_chat::start_echo_chat;

fn main() -> ExitCode {
    start_echo_chat::run()
}
