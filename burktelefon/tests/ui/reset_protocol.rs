extern crate alloc;

use burktelefon::Burk;

/// Doc comments on variants are left alone.
#[derive(Burk, Debug, PartialEq)]
enum Response {
    /// Memory cleared.
    #[burk(name = "reset_done")]
    ResetDone(bool),
}

fn main() {
    let response: Response = "reset_done true".parse().unwrap();
    assert_eq!(response, Response::ResetDone(true));
    assert_eq!(response.to_string(), "reset_done true");
}
