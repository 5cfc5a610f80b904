//! CLI based tests
use std::process::ExitCode;

use threadboard::main as board_main;

use rusty_fork::rusty_fork_test;

#[test]
fn show_config_files() {
    assert_eq!(
        board_main(["threadboard", "config-files"]),
        ExitCode::SUCCESS
    );
}

#[test]
fn help() {
    assert_eq!(board_main(["threadboard", "--help"]), ExitCode::SUCCESS);
    assert_eq!(
        board_main(["threadboard", "client", "--help"]),
        ExitCode::SUCCESS
    );
}

#[test]
fn bad_option() {
    assert_eq!(
        board_main(["threadboard", "--this-ridiculous-option-does-not-exist"]),
        ExitCode::FAILURE
    );
}

#[test]
fn no_mode() {
    assert_eq!(board_main(["threadboard"]), ExitCode::FAILURE);
}

#[test]
fn missing_port() {
    assert_eq!(board_main(["threadboard", "server"]), ExitCode::FAILURE);
    assert_eq!(
        board_main(["threadboard", "client", "localhost"]),
        ExitCode::FAILURE
    );
}

rusty_fork_test! {

#[test]
fn show_config() {
    assert_eq!(
        board_main(["threadboard", "show-config", "--port-attempts", "4"]),
        ExitCode::SUCCESS
    );
}

#[test]
fn invalid_config_rejected() {
    assert_eq!(
        board_main(["threadboard", "show-config", "--chunk-size", "0"]),
        ExitCode::FAILURE
    );
}

#[test]
fn invalid_environment_rejected() {
    std::env::set_var("THREADBOARD_TRANSFER_PORTS", "9-1");
    assert_eq!(
        board_main(["threadboard", "show-config"]),
        ExitCode::FAILURE
    );
}

#[test]
fn server_cannot_bind() {
    let dir = tempfile::tempdir().unwrap();
    let taken = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port().to_string();
    assert_eq!(
        board_main([
            "threadboard",
            "server",
            port.as_str(),
            "--data-dir",
            dir.path().to_str().unwrap(),
        ]),
        ExitCode::FAILURE
    );
}

}
