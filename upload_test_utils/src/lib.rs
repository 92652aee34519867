//! In-memory stand-ins for the host side of an upload: an event system that delivers
//! progress events and a command channel that plays the part of the upload executor.

mod local_host;

pub use local_host::{Invocation, ListenBehavior, LocalHost, UploadBehavior};
