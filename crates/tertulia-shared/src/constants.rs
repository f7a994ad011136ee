/// Application name
pub const APP_NAME: &str = "Tertulia";

/// Table names exposed by the backend
pub const TABLE_USER_PROFILES: &str = "user_profiles";
pub const TABLE_GLOBAL_CHAT_MESSAGES: &str = "global_chat_messages";
pub const TABLE_PRIVATE_CHATS: &str = "private_chats";
pub const TABLE_PRIVATE_CHAT_MESSAGES: &str = "private_chat_messages";

/// Schema that realtime filters are scoped to
pub const DEFAULT_SCHEMA: &str = "public";

/// Channel name used internally by the realtime layer. Never valid for callers.
pub const RESERVED_CHANNEL_NAME: &str = "realtime";

/// Channel carrying inserts into the global chat
pub const GLOBAL_CHAT_CHANNEL: &str = "global_chat_messages";

/// Prefix for per-conversation channels (`private_chat:<pair key>`)
pub const PRIVATE_CHAT_CHANNEL_PREFIX: &str = "private_chat";

/// Default minimum password length enforced at sign-up
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 6;

/// Error codes reported by the backend
pub const CODE_WEAK_PASSWORD: &str = "weak_password";
pub const CODE_INVALID_CREDENTIALS: &str = "invalid_credentials";
pub const CODE_USER_ALREADY_EXISTS: &str = "user_already_exists";
pub const CODE_EMAIL_INVALID: &str = "email_address_invalid";
pub const CODE_NOT_FOUND: &str = "not_found";
pub const CODE_UNIQUE_VIOLATION: &str = "23505";

/// Human-readable messages for the error codes callers are expected to hit.
/// Codes missing here fall back to the backend's raw message.
///
/// `weak_password` is left out: the minimum length is a backend setting and
/// only the backend's own message states it.
pub const ERROR_MESSAGES: &[(&str, &str)] = &[
    (CODE_INVALID_CREDENTIALS, "Wrong email or password."),
    (
        CODE_USER_ALREADY_EXISTS,
        "An account with this email already exists.",
    ),
    (CODE_EMAIL_INVALID, "The email address is not valid."),
];
