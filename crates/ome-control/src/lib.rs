//! Single-instance control for Ome.
//!
//! The first process binds a well-known loopback address and becomes the
//! primary instance. Later invocations forward their arguments to it as a
//! [`Directive`] line and exit. The primary instance marshals received
//! directives onto its own thread and runs them through the
//! [`CommandDispatcher`] against its [`Session`].

pub mod directive;
pub mod dispatch;
pub mod instance;
pub mod protocol;
pub mod session;

pub use directive::{Command, Directive};
pub use dispatch::{CommandDispatcher, DispatchOutcome};
pub use instance::{DirectiveListener, InstanceController, InstanceOptions, Launch, DEFAULT_PORT};
pub use protocol::{serialize, tokenize};
pub use session::{Frontend, Session};
