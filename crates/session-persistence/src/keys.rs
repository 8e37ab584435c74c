//! Storage key constants.

/// Collection names and fixed keys used for persisted auth state.
pub struct StorageKeys;

impl StorageKeys {
    /// Collection holding the persisted session
    pub const SESSION_COLLECTION: &'static str = "supabase_authentication";

    /// Collection holding PKCE flow verifiers
    pub const VERIFIER_COLLECTION: &'static str = "gotrue";

    /// Key of the single session record inside the session collection
    pub const PERSIST_SESSION_KEY: &'static str = "SUPABASE_PERSIST_SESSION_KEY";
}
