//! Directory key builders.
//!
//! Every process must derive the same key from the same user id, so
//! all key construction lives here.

use uuid::Uuid;

/// Reachability record of a user.
pub fn socket_key(user_id: Uuid) -> String {
    format!("socket:{user_id}")
}
