//! treffpunkt-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert die Request/Response-Envelopes, den Codec
//! (Envelope <-> Bytes) und das Length-Prefix-Framing fuer TCP.

pub mod codec;
pub mod envelope;
pub mod wire;

pub use codec::{dekodieren, kodieren, CodecError};
pub use envelope::{
    IncomingMessage, MessageType, RegisterRequest, Request, Response, ResponseResult,
    SendMessageRequest, StatusCode, UpdateStatusRequest, UserInfo, UserListRequest,
    UserListResponse, UserListType, SERVER_ABSENDER,
};
pub use wire::FrameCodec;
