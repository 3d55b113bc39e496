//! Protocol Module
//!
//! Wire codec, targeted listener registration protocol and invalidation
//! event types.

mod codec;
mod invalidation;
mod registration;

// Re-export public types
pub use codec::{PayloadReader, PayloadWriter, TAG_NAME, TAG_REGISTER};
pub use invalidation::{Invalidation, InvalidationTarget};
pub use registration::{
    Action, ListenerRegistrar, ListenerRegistrationRequest, MemberAddress, PermissionCheck,
    RegistrationResponse, RegistrationState, TargetInvoker, TargetedRequest,
    DEFAULT_INVOCATION_TIMEOUT,
};
