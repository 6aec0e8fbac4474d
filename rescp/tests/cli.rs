//! CLI based tests
// (c) 2026 rescp developers

use std::process::ExitCode;

use rescp::main as rescp_main;

use rusty_fork::rusty_fork_test;

#[test]
fn show_config_files() {
    assert_eq!(rescp_main(["rescp", "--config-files"]), ExitCode::SUCCESS);
}

#[test]
fn bad_option() {
    assert_eq!(
        rescp_main(["rescp", "--this-ridiculous-option-does-not-exist"]),
        ExitCode::FAILURE
    );
}

#[test]
fn no_files() {
    assert_eq!(rescp_main(["rescp"]), ExitCode::FAILURE);
}

rusty_fork_test! {

#[test]
fn help() {
    assert_eq!(rescp_main(["rescp", "--help"]), ExitCode::SUCCESS);
}

#[test]
fn show_config() {
    assert_eq!(
        rescp_main([
            "rescp",
            "--show-config",
            "--transport",
            "ssh-client",
            "--address",
            "example.com",
        ]),
        ExitCode::SUCCESS
    );
}

#[test]
fn show_config_invalid() {
    assert_eq!(
        rescp_main(["rescp", "--show-config", "--attempts", "0", "--address", "h", "--retry", "bounded"]),
        ExitCode::FAILURE
    );
}

#[test]
fn missing_source_gives_up_at_once() {
    assert_eq!(
        rescp_main([
            "rescp",
            "--transport",
            "ssh-client",
            "--ssh",
            "/nonexistent/ssh",
            "--stop-on-permanent",
            "/nonexistent/source.bin",
            "example.com:/tmp/source.bin",
        ]),
        ExitCode::FAILURE
    );
}

#[test]
fn ssh_fails() {
    assert_eq!(
        rescp_main([
            "rescp",
            "--transport",
            "ssh-client",
            "--ssh",
            "false",
            "--retry",
            "single",
            "Cargo.toml",
            "127.0.0.1:/tmp/Cargo.toml",
        ]),
        ExitCode::FAILURE
    );
}

}
