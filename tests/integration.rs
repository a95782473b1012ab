//! End-to-end coverage of the session runner, catch-all probe and racer
//! against a loopback mock SMTP server (spec §8 scenarios).

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use native_tls::TlsConnector;

use mailprobe::racer::{race, run_session};
use mailprobe::smtp::SessionOptions;
use mailprobe::verdict::{DiagnosticTag, RecipientStatus};

fn spawn_mock_server(script: Vec<(&'static str, &'static str)>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let port = listener.local_addr().expect("addr").port();
    let (ready_tx, ready_rx) = mpsc::channel();
    thread::spawn(move || {
        ready_tx.send(()).ok();
        if let Ok((mut stream, _)) = listener.accept() {
            let _ = handle_session(&mut stream, script);
        }
    });
    ready_rx.recv().expect("server ready");
    port
}

/// Like [`spawn_mock_server`], but handles one catch-all dialog: two RCPTs
/// in the same session, both answered `250`.
fn spawn_catch_all_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let port = listener.local_addr().expect("addr").port();
    let (ready_tx, ready_rx) = mpsc::channel();
    thread::spawn(move || {
        ready_tx.send(()).ok();
        if let Ok((mut stream, _)) = listener.accept() {
            let _ = handle_session(
                &mut stream,
                vec![
                    ("EHLO", "250 mock.smtp.test\r\n"),
                    ("MAIL FROM", "250 2.1.0 OK\r\n"),
                    ("RCPT TO", "250 2.1.5 OK\r\n"),
                    ("RCPT TO", "250 2.1.5 OK\r\n"),
                    ("QUIT", "221 bye\r\n"),
                ],
            );
        }
    });
    ready_rx.recv().expect("server ready");
    port
}

fn handle_session(stream: &mut TcpStream, script: Vec<(&'static str, &'static str)>) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    stream.write_all(b"220 mock.smtp.test ESMTP\r\n")?;
    stream.flush()?;
    for (expected, response) in script {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        assert!(
            line.starts_with(expected),
            "expected command starting with '{expected}', got '{line}'"
        );
        stream.write_all(response.as_bytes())?;
        stream.flush()?;
    }
    Ok(())
}

fn options() -> SessionOptions {
    SessionOptions {
        helo_name: "mailprobe.test".to_string(),
        mail_from: "postmaster@example.com".to_string(),
        timeout: Duration::from_secs(3),
    }
}

#[test]
fn plain_accept_classifies_as_valid() {
    let port = spawn_mock_server(vec![
        ("EHLO", "250 mock.smtp.test\r\n"),
        ("MAIL FROM", "250 2.1.0 OK\r\n"),
        ("RCPT TO", "250 2.1.5 OK\r\n"),
        ("QUIT", "221 bye\r\n"),
    ]);
    let connector = TlsConnector::new().unwrap();
    let cancelled = AtomicBool::new(false);

    let outcome = run_session(
        "127.0.0.1",
        port,
        "example.com",
        "alice@example.com",
        &options(),
        &connector,
        &cancelled,
    );

    assert_eq!(outcome.status, RecipientStatus::Valid);
    assert_eq!(outcome.reply_code, 250);
}

#[test]
fn user_not_found_classifies_correctly() {
    let port = spawn_mock_server(vec![
        ("EHLO", "250 mock.smtp.test\r\n"),
        ("MAIL FROM", "250 2.1.0 OK\r\n"),
        ("RCPT TO", "550 5.1.1 No such user here\r\n"),
        ("QUIT", "221 bye\r\n"),
    ]);
    let connector = TlsConnector::new().unwrap();
    let cancelled = AtomicBool::new(false);

    let outcome = run_session(
        "127.0.0.1",
        port,
        "example.com",
        "nobody@example.com",
        &options(),
        &connector,
        &cancelled,
    );

    assert_eq!(outcome.status, RecipientStatus::UserNotFound);
}

#[test]
fn blacklist_text_match_sets_blacklisted_status() {
    let port = spawn_mock_server(vec![
        ("EHLO", "250 mock.smtp.test\r\n"),
        ("MAIL FROM", "250 2.1.0 OK\r\n"),
        ("RCPT TO", "550 5.7.1 blocked by spamhaus, see zen.spamhaus.org\r\n"),
        ("QUIT", "221 bye\r\n"),
    ]);
    let connector = TlsConnector::new().unwrap();
    let cancelled = AtomicBool::new(false);

    let outcome = run_session(
        "127.0.0.1",
        port,
        "example.com",
        "alice@example.com",
        &options(),
        &connector,
        &cancelled,
    );

    assert_eq!(outcome.status, RecipientStatus::Blacklisted);
    assert_eq!(outcome.diagnostic_tag, DiagnosticTag::BlockedByBlacklist);
}

#[test]
fn catch_all_probe_confirms_on_double_accept() {
    let port = spawn_catch_all_server();
    let connector = TlsConnector::new().unwrap();
    let cancelled = AtomicBool::new(false);

    let catch_all = mailprobe::catchall::is_catch_all(
        "127.0.0.1",
        port,
        "example.com",
        "alice@example.com",
        &options(),
        &connector,
        &cancelled,
    )
    .expect("catch-all probe should succeed against the mock server");

    assert!(catch_all);
}

/// Spawns a listener that accepts the connection and then never writes a
/// byte, so the client blocks on the banner read until its own timeout
/// fires (spec §8 scenario: "connect to MX times out on all three ports").
fn spawn_silent_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let port = listener.local_addr().expect("addr").port();
    thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            thread::sleep(Duration::from_secs(5));
            drop(stream);
        }
    });
    port
}

#[test]
fn all_ports_time_out_reports_temporary_failure() {
    let port = spawn_silent_server();
    let connector = TlsConnector::new().unwrap();

    let outcome = race(
        "127.0.0.1",
        "example.com",
        "alice@example.com",
        &SessionOptions {
            timeout: Duration::from_millis(400),
            ..options()
        },
        &connector,
        &[port],
    );

    assert_eq!(outcome.status, RecipientStatus::TemporaryFailure);
    assert_eq!(outcome.diagnostic_tag, DiagnosticTag::Timeout);
}

#[test]
fn all_ports_unreachable_reports_all_ports_failed() {
    // Bind then immediately drop the listener so the port refuses connections.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let connector = TlsConnector::new().unwrap();
    let outcome = race(
        "127.0.0.1",
        "example.com",
        "alice@example.com",
        &SessionOptions {
            timeout: Duration::from_millis(500),
            ..options()
        },
        &connector,
        &[port],
    );

    assert_eq!(outcome.status, RecipientStatus::UnknownFailure);
    assert_eq!(outcome.diagnostic_tag, DiagnosticTag::AllPortsFailed);
}
