//! Commander over the in-memory transport, as a remote peer sees it.

use buggy_core::{Command, Commander, Responder};
use buggy_hardware::MemoryTransport;
use buggy_traits::TextMode;
use rstest::rstest;

#[derive(Default)]
struct Inbox {
    commands: Vec<Command>,
    notices: Vec<String>,
}

impl Responder for Inbox {
    fn command(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_owned());
    }
}

#[rstest]
fn commands_arrive_in_order() {
    let (transport, remote) = MemoryTransport::new("mem");
    let mut commander = Commander::<MemoryTransport>::new(transport);
    let mut inbox = Inbox::default();

    remote.push(b"x200,y1");
    assert_eq!(commander.update(&mut inbox).expect("update"), 1);
    remote.push(b"0,");
    assert_eq!(commander.update(&mut inbox).expect("update"), 1);

    assert_eq!(
        inbox.commands,
        vec![Command::new('x', 200), Command::new('y', 10)]
    );
    assert_eq!(commander.frames_received(), 2);
}

#[rstest]
fn sent_frames_reach_the_peer() {
    let (transport, remote) = MemoryTransport::new("mem");
    let mut commander = Commander::<MemoryTransport>::new(transport);
    assert!(commander.send('Q', 0));
    assert!(commander.send('M', 5));
    commander.flush().expect("flush");
    assert_eq!(remote.take_output(), b"Q,M5,");
}

#[rstest]
fn slow_link_still_drains_completely() {
    let (transport, remote) = MemoryTransport::new("mem");
    let mut commander = Commander::<MemoryTransport>::new(transport.with_max_send(3));
    commander.send('a', 1234);
    commander.send('b', 0);
    assert_eq!(commander.flush().expect("flush"), 8);
    assert_eq!(remote.take_output(), b"a1234,b,");
    assert_eq!(commander.pending(), 0);
}

#[rstest]
#[case::ui(TextMode::Ui, "\r\n", "a1,\r\nhello\r\nb2,")]
#[case::chained(
    TextMode::Chained,
    "\n",
    "a1,p104,p101,p108,p108,p111,p,b2,"
)]
fn text_follows_the_transport_mode(
    #[case] mode: TextMode,
    #[case] eol: &'static str,
    #[case] expected: &str,
) {
    let (transport, remote) = MemoryTransport::new("mem");
    let mut commander =
        Commander::<MemoryTransport>::new(transport.with_text_mode(mode).with_eol(eol));
    commander.send('a', 1);
    commander.print_line("hello");
    commander.send('b', 2);
    commander.flush().expect("flush");
    assert_eq!(String::from_utf8(remote.take_output()).expect("ascii"), expected);
}

#[rstest]
fn chained_text_from_the_peer_is_reassembled() {
    let (transport, remote) = MemoryTransport::new("mem");
    let mut commander = Commander::<MemoryTransport>::new(transport);
    let mut inbox = Inbox::default();
    remote.push(b"p111,p107,p,y5,");
    commander.update(&mut inbox).expect("update");
    assert_eq!(inbox.notices, vec!["ok".to_owned()]);
    assert_eq!(inbox.commands, vec![Command::new('y', 5)]);
}

#[rstest]
fn closed_link_is_reported() {
    let (transport, remote) = MemoryTransport::new("mem");
    let mut commander = Commander::<MemoryTransport>::new(transport);
    remote.close();
    let err = commander.receive().expect_err("closed");
    assert!(matches!(
        err.downcast_ref::<buggy_core::BuggyError>(),
        Some(buggy_core::BuggyError::Disconnected)
    ));
}
