extern crate alloc;

use burktelefon::Burk;

#[derive(Burk, Debug, PartialEq)]
enum Command {
    #[burk(name = "reset")]
    Reset(u8),
    #[burk(name = "mv")]
    Move(f32, f32),
    Status,
}

#[test]
fn parses_every_variant() {
    assert_eq!("reset 1".parse(), Ok(Command::Reset(1)));
    assert_eq!("mv 11.5 -100".parse(), Ok(Command::Move(11.5, -100.0)));
    assert_eq!("STATUS".parse(), Ok(Command::Status));
}

#[test]
fn rejects_bad_lines() {
    for line in ["", "reset", "reset x", "reset 1 2", "status", "jump 1"] {
        let err = line.parse::<Command>().unwrap_err();
        assert_eq!(err, format!("failed to parse: {:?}", line));
    }
}

#[test]
fn displays_command_words() {
    assert_eq!(Command::Reset(0).to_string(), "reset 0");
    assert_eq!(Command::Move(1.5, 2.0).to_string(), "mv 1.5 2");
    assert_eq!(Command::Status.to_string(), "STATUS");
}

#[test]
fn ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/reset_protocol.rs");
}
