//! Listener Registration Protocol Module
//!
//! Client side of the invalidation listener registration protocol: a
//! targeted request routed to one specific cluster member, carrying the
//! listener configuration blob, gated by a permission capability, and
//! acknowledged by that member.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::cache::NearCacheStore;
use crate::error::{NearCacheError, Result};
use crate::protocol::codec::{PayloadReader, PayloadWriter, TAG_NAME, TAG_REGISTER};

/// Default bound on the registration round trip.
pub const DEFAULT_INVOCATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Named-field tag for the acknowledgement's applied flag.
const TAG_APPLIED: u8 = b'a';

// == Member Address ==
/// Address of one specific cluster member.
///
/// Raw wire layout: length-prefixed UTF-8 host followed by a bare u16
/// port, always read back in that order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberAddress {
    /// Host name or IP literal
    pub host: String,
    /// Member port
    pub port: u16,
}

impl MemberAddress {
    /// Creates a new member address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Appends this address to a payload's raw section.
    pub fn write_raw(&self, writer: &mut PayloadWriter) {
        writer.write_raw_blob(self.host.as_bytes());
        writer.write_raw_u16(self.port);
    }

    /// Reads an address from a payload's raw section.
    pub fn read_raw(reader: &mut PayloadReader) -> Result<Self> {
        let host_bytes = reader.read_raw_blob()?;
        let host = String::from_utf8(host_bytes.to_vec())
            .map_err(|_| NearCacheError::EncodingFault("address host is not utf-8".to_string()))?;
        let port = reader.read_raw_u16()?;
        Ok(Self { host, port })
    }
}

impl std::fmt::Display for MemberAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// == Permission ==
/// Action a permission capability can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Register or unregister an invalidation listener.
    Listen,
}

/// Permission capability consulted before a request is dispatched.
///
/// Modeled as a pure function of `(object name, action)`; implemented
/// directly by closures.
pub trait PermissionCheck: Send + Sync {
    /// Returns whether the action is allowed on the named object.
    fn allows(&self, object_name: &str, action: Action) -> bool;
}

impl<F> PermissionCheck for F
where
    F: Fn(&str, Action) -> bool + Send + Sync,
{
    fn allows(&self, object_name: &str, action: Action) -> bool {
        self(object_name, action)
    }
}

// == Targeted Request ==
/// A request that must be routed to one specific member, not load-balanced.
///
/// Carries its own encoding, decoding, routing target and permission
/// requirement as data; there is no shared mutable request state.
pub trait TargetedRequest: Sized {
    /// Encodes the request into its wire payload.
    fn encode(&self) -> Result<Bytes>;
    /// Decodes a request from its wire payload.
    fn decode(payload: Bytes) -> Result<Self>;
    /// The one member this request must be sent to.
    fn target_address(&self) -> &MemberAddress;
    /// The permission this request must pass before dispatch.
    fn required_permission(&self) -> (&str, Action);
}

// == Listener Registration Request ==
/// Request to register or unregister an invalidation listener for one
/// distributed object on one specific member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerRegistrationRequest {
    /// Distributed object name the listener is scoped to
    pub name: String,
    /// Opaque serialized listener configuration
    pub listener_config: Bytes,
    /// True to register, false to unregister
    pub register: bool,
    /// The member that owns the listener state
    pub target: MemberAddress,
}

impl TargetedRequest for ListenerRegistrationRequest {
    /// Encodes the named-field section `{n, r}` followed by the raw
    /// section `[listener config blob][target address]`, in that order.
    fn encode(&self) -> Result<Bytes> {
        let mut writer = PayloadWriter::new();
        writer.write_string_field(TAG_NAME, &self.name);
        writer.write_bool_field(TAG_REGISTER, self.register);
        writer.write_raw_blob(&self.listener_config);
        self.target.write_raw(&mut writer);
        Ok(writer.finish())
    }

    /// Decodes named fields by tag, then the raw section strictly in the
    /// order written.
    fn decode(payload: Bytes) -> Result<Self> {
        let mut reader = PayloadReader::new(payload)?;
        let name = reader.read_string_field(TAG_NAME)?;
        let register = reader.read_bool_field(TAG_REGISTER)?;
        let listener_config = reader.read_raw_blob()?;
        let target = MemberAddress::read_raw(&mut reader)?;
        Ok(Self {
            name,
            listener_config,
            register,
            target,
        })
    }

    fn target_address(&self) -> &MemberAddress {
        &self.target
    }

    fn required_permission(&self) -> (&str, Action) {
        (&self.name, Action::Listen)
    }
}

// == Registration Response ==
/// Acknowledgement from the target member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationResponse {
    /// Whether the unit of work changed listener state on the member.
    ///
    /// An unregister of a listener that was never registered acks with
    /// `applied == false`.
    pub applied: bool,
}

impl RegistrationResponse {
    /// Encodes the acknowledgement payload.
    pub fn encode(&self) -> Bytes {
        let mut writer = PayloadWriter::new();
        writer.write_bool_field(TAG_APPLIED, self.applied);
        writer.finish()
    }

    /// Decodes an acknowledgement payload.
    pub fn decode(payload: Bytes) -> Result<Self> {
        let reader = PayloadReader::new(payload)?;
        let applied = reader.read_bool_field(TAG_APPLIED)?;
        Ok(Self { applied })
    }
}

// == Target Invoker ==
/// Transport seam for the targeted round trip.
///
/// The real implementation lives in the invocation layer; tests supply an
/// in-process member stub. The invoker must deliver the payload to exactly
/// the given address, never a hash-selected member.
pub trait TargetInvoker {
    /// Sends the request payload to the target and awaits the raw ack.
    fn invoke(
        &self,
        target: &MemberAddress,
        request: Bytes,
    ) -> impl Future<Output = Result<Bytes>> + Send;
}

// == Registration State ==
/// Client-side view of the subscription lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationState {
    /// No subscription exists.
    #[default]
    Unregistered,
    /// A register request is in flight.
    Pending,
    /// The target member acknowledged the registration.
    Registered,
    /// An unregister request is in flight.
    PendingUnregister,
}

// == Listener Registrar ==
/// Drives the subscription state machine for one near cache.
///
/// `Unregistered -> Pending -> Registered -> PendingUnregister ->
/// Unregistered`; losing the target while `Registered` drops straight back
/// to `Unregistered` and conservatively invalidates the whole store.
#[derive(Debug)]
pub struct ListenerRegistrar<K, T, P> {
    name: String,
    target: MemberAddress,
    store: Arc<NearCacheStore<K>>,
    invoker: T,
    permission: P,
    state: RegistrationState,
    timeout: Duration,
}

impl<K, T, P> ListenerRegistrar<K, T, P>
where
    K: Eq + Hash + Clone,
    T: TargetInvoker,
    P: PermissionCheck,
{
    /// Creates a registrar for the store's distributed object, targeting
    /// the given member.
    pub fn new(
        store: Arc<NearCacheStore<K>>,
        target: MemberAddress,
        invoker: T,
        permission: P,
    ) -> Self {
        Self {
            name: store.config().name().to_string(),
            target,
            store,
            invoker,
            permission,
            state: RegistrationState::Unregistered,
            timeout: DEFAULT_INVOCATION_TIMEOUT,
        }
    }

    /// Overrides the invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the current subscription state.
    pub fn state(&self) -> RegistrationState {
        self.state
    }

    // == Register ==
    /// Registers the invalidation listener on the target member.
    ///
    /// The permission capability is consulted before anything is encoded or
    /// dispatched; denial aborts with no server-side mutation. A timeout or
    /// unreachable target leaves the subscription `Unregistered` - failed,
    /// not silently retried. A cache configured with
    /// `invalidate_on_change == false` wants no remote events at all, so
    /// nothing is dispatched and the state stays `Unregistered`.
    pub async fn register(&mut self, listener_config: Bytes) -> Result<()> {
        if !self.store.config().invalidate_on_change() {
            debug!(name = %self.name, "invalidate-on-change disabled, skipping registration");
            return Ok(());
        }
        if !self.permission.allows(&self.name, Action::Listen) {
            return Err(NearCacheError::PermissionDenied(self.name.clone()));
        }

        let request = ListenerRegistrationRequest {
            name: self.name.clone(),
            listener_config,
            register: true,
            target: self.target.clone(),
        };
        let payload = request.encode()?;

        self.state = RegistrationState::Pending;
        match self.round_trip(payload).await {
            Ok(_ack) => {
                // A duplicate registration acks not-applied; either way the
                // subscription is live on the member.
                self.state = RegistrationState::Registered;
                debug!(name = %self.name, target = %self.target, "listener registered");
                Ok(())
            }
            Err(err) => {
                self.state = RegistrationState::Unregistered;
                Err(err)
            }
        }
    }

    // == Unregister ==
    /// Unregisters the invalidation listener from the target member.
    ///
    /// Acknowledged-but-not-applied means no listener was registered under
    /// this name; that is surfaced as `NotRegistered`.
    pub async fn unregister(&mut self) -> Result<()> {
        if !self.permission.allows(&self.name, Action::Listen) {
            return Err(NearCacheError::PermissionDenied(self.name.clone()));
        }

        let request = ListenerRegistrationRequest {
            name: self.name.clone(),
            listener_config: Bytes::new(),
            register: false,
            target: self.target.clone(),
        };
        let payload = request.encode()?;

        let was_registered = self.state == RegistrationState::Registered;
        self.state = RegistrationState::PendingUnregister;
        match self.round_trip(payload).await {
            Ok(ack) => {
                self.state = RegistrationState::Unregistered;
                if ack.applied {
                    debug!(name = %self.name, target = %self.target, "listener unregistered");
                    Ok(())
                } else {
                    Err(NearCacheError::NotRegistered(self.name.clone()))
                }
            }
            Err(err) => {
                self.state = RegistrationState::Unregistered;
                if was_registered {
                    // The member may still hold listener state we can no
                    // longer reach; assume everything local is stale.
                    warn!(name = %self.name, target = %self.target,
                        "unregister failed, invalidating near cache");
                    self.store.invalidate_all();
                }
                Err(err)
            }
        }
    }

    // == Connection Lost ==
    /// Handles the target leaving the cluster while `Registered`.
    ///
    /// Transitions straight to `Unregistered` and conservatively
    /// invalidates the whole store rather than risk serving stale data
    /// silently.
    pub fn connection_lost(&mut self) {
        if self.state == RegistrationState::Registered {
            warn!(name = %self.name, target = %self.target,
                "registration target lost, invalidating near cache");
            self.state = RegistrationState::Unregistered;
            self.store.invalidate_all();
        }
    }

    async fn round_trip(&self, payload: Bytes) -> Result<RegistrationResponse> {
        let invocation = self.invoker.invoke(&self.target, payload);
        match tokio::time::timeout(self.timeout, invocation).await {
            Err(_) => Err(NearCacheError::InvocationTimeout(self.timeout)),
            Ok(Err(err)) => Err(err),
            Ok(Ok(ack)) => RegistrationResponse::decode(ack),
        }
    }
}
