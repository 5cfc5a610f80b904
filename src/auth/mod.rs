//! Authentication and session state
//!
//! Two registries with narrow interfaces, owned by the server and handed to the
//! handlers that need them:
//! * a [`CredentialStore`] answers "what is this identity's secret?" and records new identities;
//! * the [`SessionRegistry`] tracks which peer address is logged in as which identity.

mod credentials;
mod session;

pub use credentials::{is_storable, CredentialStore, FileCredentials, MemoryCredentials};
pub use session::SessionRegistry;
