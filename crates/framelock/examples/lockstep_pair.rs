//! Two lockstep peers on loopback advancing a tiny shared simulation.
//!
//! Run with: `cargo run --example lockstep_pair`

use std::{collections::BTreeMap, thread, time::Duration};

use framelock::{Config, DatagramSocket, FrameInput, LockstepSession, PeerId, SessionSocket};

const FRAMES: i64 = 30;

fn run_peer(session: LockstepSession) -> i64 {
    // Toy simulation: every peer contributes its id each frame and all
    // peers accumulate the same deterministic sum.
    let mut state: i64 = 0;
    for frame in 0..FRAMES {
        let input = session.local_peer_id().to_be_bytes().to_vec();
        session.enqueue_local_input(FrameInput::new(frame, input)).unwrap();

        session.await_frame().unwrap();
        state += i64::from(session.local_peer_id());
        for (_, input) in session.collect_frame().unwrap() {
            let mut id = [0u8; 2];
            id.copy_from_slice(input.payload());
            state += i64::from(PeerId::from_be_bytes(id));
        }
    }
    state
}

fn main() {
    let config = Config { retransmission_timeout: Duration::from_millis(50), ..Config::default() };

    // Peer addresses are only known after binding, so bind both sockets
    // first and wire the sessions up from the resulting addresses.
    let socket_a = SessionSocket::bind("127.0.0.1:0", &config).unwrap();
    let socket_b = SessionSocket::bind("127.0.0.1:0", &config).unwrap();
    let addr_a = socket_a.local_addr().unwrap();
    let addr_b = socket_b.local_addr().unwrap();

    let session_a = LockstepSession::with_socket(
        socket_a,
        1,
        BTreeMap::from([(2, addr_b)]),
        config.clone(),
    )
    .unwrap();
    let session_b =
        LockstepSession::with_socket(socket_b, 2, BTreeMap::from([(1, addr_a)]), config).unwrap();

    let b = thread::spawn(move || run_peer(session_b));
    let state_a = run_peer(session_a);
    let state_b = b.join().unwrap();

    println!("peer 1 final state: {state_a}");
    println!("peer 2 final state: {state_b}");
    assert_eq!(state_a, state_b, "lockstep peers must agree");
}
