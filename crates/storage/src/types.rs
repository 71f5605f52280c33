//! Identifier newtypes used across storage operations.
//!
//! Every row this crate stores is keyed by a signed 64-bit integer, either a
//! Snowflake ID minted by the token generator or a sequence value assigned by
//! the backing store. The newtypes below keep those integers from being mixed
//! up at compile time.

/// Macro to define a newtype wrapper around `i64` with standard trait
/// implementations.
///
/// Each generated type:
/// - Is a transparent wrapper around `i64` (zero runtime cost)
/// - Derives `Copy`, `Clone`, `Debug`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Derives `Serialize` and `Deserialize` (transparent)
/// - Implements `From<i64>` and `Into<i64>` for SDK interop
/// - Implements `Display` that outputs the inner value
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// User ID (Snowflake ID).
    ///
    /// Identifies the account a token is issued to and the subject of
    /// role and tag assignments. Wrapping the raw `i64` makes passing a
    /// `RoleId` where a `UserId` is expected a compile-time error.
    ///
    /// # Examples
    ///
    /// ```
    /// use tessera_storage::UserId;
    ///
    /// let user = UserId::from(42);
    /// assert_eq!(i64::from(user), 42);
    /// assert_eq!(user.to_string(), "42");
    /// ```
    UserId
);

define_id!(
    /// Role ID (Snowflake ID).
    ///
    /// Roles bundle permissions and are assigned to users. Access checks
    /// walk user to role to permission.
    ///
    /// # Examples
    ///
    /// ```
    /// use tessera_storage::RoleId;
    ///
    /// let role = RoleId::from(100);
    /// assert_eq!(i64::from(role), 100);
    /// ```
    RoleId
);

define_id!(
    /// Permission ID (Snowflake ID).
    ///
    /// Permissions are named capabilities granted to roles.
    ///
    /// # Examples
    ///
    /// ```
    /// use tessera_storage::PermissionId;
    ///
    /// let perm = PermissionId::from(7);
    /// assert_eq!(i64::from(perm), 7);
    /// ```
    PermissionId
);

define_id!(
    /// Tag ID (Snowflake ID).
    ///
    /// Tags are free-form labels attached to users, carrying no access
    /// semantics of their own.
    ///
    /// # Examples
    ///
    /// ```
    /// use tessera_storage::TagId;
    ///
    /// let tag = TagId::from(3);
    /// assert_eq!(i64::from(tag), 3);
    /// ```
    TagId
);

define_id!(
    /// Token ID (Snowflake ID).
    ///
    /// Minted once per issued access token and carried in the token's
    /// `jti` claim. Revocation records are keyed by this ID, so a token
    /// can be blacklisted without storing the token string itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use tessera_storage::TokenId;
    ///
    /// let token = TokenId::from(6917529027641081856);
    /// assert_eq!(token.to_string(), "6917529027641081856");
    /// ```
    TokenId
);

define_id!(
    /// Signing key ID (store-assigned sequence).
    ///
    /// Identifies a registered signing keypair. Issued tokens carry this
    /// ID in their `kid` header so verification can select the matching
    /// public key after a rotation.
    ///
    /// # Examples
    ///
    /// ```
    /// use tessera_storage::KeyId;
    ///
    /// let key = KeyId::from(1);
    /// assert_eq!(i64::from(key), 1);
    /// ```
    KeyId
);
