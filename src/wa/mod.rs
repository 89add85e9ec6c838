pub mod auth;
pub mod binary_node;
pub mod error;
pub mod events;
pub mod handshake;
pub mod keys;
pub mod noise_md;
pub mod proto;
pub mod qr;
pub mod signal;
pub mod transport;
pub mod version;

pub use error::{
    BinaryNodeError,
    HandshakeError,
    HandshakePhase,
    NoiseError,
    QrError,
    SignalError,
    TransportError,
};
pub use handshake::{MdHandshakeOutcome, do_handshake_md};
pub use keys::{KeyPair, generate_keypair, generate_registration_id};
pub use qr::generate_qr_string;
pub use signal::{InMemorySignalStore, decrypt, encrypt, init_session};
pub use transport::WsTransport;
