//! End-to-end tests: a real server on localhost, driven through the client library

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use assertables::assert_contains;
use indicatif::ProgressBar;
use pretty_assertions::assert_eq;

use threadboard::client::{Client, LoginOutcome};
use threadboard::util::PortRange;
use threadboard::{Configuration, Server};

fn config_for(dir: &Path) -> Configuration {
    Configuration {
        data_dir: dir.into(),
        transfer_ports: PortRange { begin: 0, end: 0 },
        transfer_timeout: 5,
        login_timeout: 5,
        ..Configuration::system_default().clone()
    }
}

/// Runs `scenario` against a freshly bound server until the scenario finishes
async fn with_server<F, Fut>(dir: &Path, scenario: F)
where
    F: FnOnce(SocketAddr) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut server = Server::bind(config_for(dir), 0).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::select! {
        r = server.run() => panic!("server stopped: {r:?}"),
        () = scenario(addr) => (),
    }
}

async fn client(addr: SocketAddr) -> Client {
    Client::connect(addr)
        .await
        .unwrap()
        .with_reply_timeout(Duration::from_secs(5))
}

async fn logged_in(addr: SocketAddr, identity: &str) -> Client {
    let c = client(addr).await;
    assert!(c.login(identity, "pw").await.unwrap().is_success());
    c
}

async fn ask(c: &Client, text: &str) -> String {
    c.request(text).await.unwrap().text().to_string()
}

#[tokio::test]
async fn registration_then_login() {
    let dir = tempfile::tempdir().unwrap();
    with_server(dir.path(), |addr| async move {
        let c = client(addr).await;
        assert_eq!(
            ask(&c, "LST").await,
            "Error: Please login first using: login"
        );
        assert_eq!(
            c.login("alice", "s3cret").await.unwrap(),
            LoginOutcome::Registered
        );
        assert_eq!(ask(&c, "XIT").await, "Goodbye!");
        assert_eq!(
            c.login("alice", "wrong").await.unwrap(),
            LoginOutcome::Failed
        );
        assert_eq!(
            c.login("alice", "s3cret").await.unwrap(),
            LoginOutcome::LoggedIn
        );
        assert_eq!(ask(&c, "LST").await, "No threads exist.");
    })
    .await;
    assert_eq!(
        std::fs::read_to_string(dir.path().join("credentials.txt")).unwrap(),
        "alice s3cret\n"
    );
}

#[tokio::test]
async fn one_session_per_identity() {
    let dir = tempfile::tempdir().unwrap();
    with_server(dir.path(), |addr| async move {
        let first = logged_in(addr, "alice").await;
        let second = client(addr).await;
        assert_eq!(
            second.login("alice", "pw").await.unwrap(),
            LoginOutcome::AlreadyActive
        );
        assert_eq!(
            ask(&second, "LST").await,
            "Error: Please login first using: login"
        );
        assert_eq!(ask(&first, "XIT").await, "Goodbye!");
        assert_eq!(
            second.login("alice", "pw").await.unwrap(),
            LoginOutcome::LoggedIn
        );
    })
    .await;
}

#[tokio::test]
async fn threads_and_renumbering() {
    let dir = tempfile::tempdir().unwrap();
    with_server(dir.path(), |addr| async move {
        let alice = logged_in(addr, "alice").await;
        let bob = logged_in(addr, "bob").await;

        assert_eq!(ask(&alice, "CRT general").await, "Thread general created.");
        assert_eq!(ask(&alice, "CRT lounge").await, "Thread lounge created.");
        assert_eq!(
            ask(&bob, "CRT general").await,
            "Error: Thread 'general' already exists."
        );
        assert_eq!(
            ask(&bob, "LST").await,
            "current threads:\ngeneral\nlounge"
        );

        let _ = ask(&alice, "MSG general first post").await;
        let _ = ask(&bob, "MSG general second post").await;
        assert_eq!(
            ask(&alice, "MSG general third post").await,
            "Message posted to thread general."
        );
        assert_eq!(
            ask(&bob, "DLT general 1").await,
            "Error: You can only delete your own message."
        );
        assert_eq!(
            ask(&alice, "DLT general 1").await,
            "Message 1 deleted from thread 'general'."
        );
        assert_eq!(
            ask(&bob, "RDT general").await,
            "1 bob: second post\n2 alice: third post"
        );
        assert_eq!(
            ask(&bob, "EDT general 1 second post, revised").await,
            "Message 1 edited successfully."
        );
        assert_eq!(
            ask(&alice, "EDT general 9 nope").await,
            "Error: Invalid message number."
        );
        assert_eq!(
            ask(&alice, "DLT general one").await,
            "Error: Message number must be an integer."
        );
        assert_eq!(ask(&alice, "RDT lounge").await, "Thread 'lounge' has no messages.");
        assert_eq!(
            ask(&alice, "RDT nowhere").await,
            "Error: Thread 'nowhere' does not exist."
        );
        assert_eq!(ask(&alice, "MSG general").await, "Error: Invalid MSG format.");
        assert_eq!(ask(&alice, "HELLO").await, "Error: Unrecognized command.");
        assert_eq!(
            ask(&bob, "RMV general").await,
            "Error: Only the thread creator can remove it."
        );
    })
    .await;
    assert_eq!(
        std::fs::read_to_string(dir.path().join("general")).unwrap(),
        "alice\n1 bob: second post, revised\n2 alice: third post\n"
    );
}

#[tokio::test]
async fn attachments() {
    let dir = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let payload: Vec<u8> = (0..150_000u32)
        .map(|i| u8::try_from(i.wrapping_mul(31) % 256).unwrap())
        .collect();
    let source = local.path().join("data.bin");
    std::fs::write(&source, &payload).unwrap();
    let downloads = local.path().join("downloads");
    std::fs::create_dir(&downloads).unwrap();

    with_server(dir.path(), |addr| {
        let source = source.clone();
        let downloads = downloads.clone();
        async move {
            let alice = logged_in(addr, "alice").await;
            let bob = logged_in(addr, "bob").await;
            let bar = ProgressBar::hidden();
            let _ = ask(&alice, "CRT general").await;

            let reply = alice.upload("nowhere", &source, &bar).await.unwrap();
            assert_eq!(reply.text(), "Error: Thread 'nowhere' does not exist.");

            let reply = alice.upload("general", &source, &bar).await.unwrap();
            assert_eq!(
                reply.text(),
                "File 'data.bin' uploaded to thread 'general' successfully."
            );
            let reply = bob.upload("general", &source, &bar).await.unwrap();
            assert_eq!(
                reply.text(),
                "Error: File 'data.bin' already uploaded to thread 'general'."
            );

            let _ = ask(&bob, "MSG general got it").await;
            assert_eq!(
                ask(&bob, "RDT general").await,
                "alice uploaded data.bin\n1 bob: got it"
            );

            let reply = bob
                .download("general", "data.bin", &downloads, &bar)
                .await
                .unwrap();
            assert_eq!(
                reply.text(),
                "File 'data.bin' downloaded successfully from thread 'general'."
            );
            let reply = bob
                .download("general", "other.bin", &downloads, &bar)
                .await
                .unwrap();
            assert_eq!(
                reply.text(),
                "Error: File 'other.bin' was not found in thread 'general'."
            );

            // a missing local file never reaches the server
            let e = bob
                .upload("general", &downloads.join("absent.txt"), &bar)
                .await
                .unwrap_err();
            assert_contains!(e.to_string(), "not found");
            assert_eq!(ask(&bob, "LST").await, "current threads:\ngeneral");

            assert_eq!(
                ask(&alice, "RMV general").await,
                "Thread 'general' and its associated files have been removed."
            );
            assert_eq!(ask(&alice, "LST").await, "No threads exist.");
        }
    })
    .await;

    assert_eq!(std::fs::read(downloads.join("data.bin")).unwrap(), payload);
    assert!(!downloads.join("other.bin").exists());
    assert!(!dir.path().join("general").exists());
    assert!(!dir.path().join("general-data.bin").exists());
}
