//! Identifier allocation for not-yet-written documents.

use rand::Rng;

use crate::Connection;

/// Alphabet of the store's auto-generated document ids.
pub const AUTO_ID_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of an auto-generated document id.
pub const AUTO_ID_LENGTH: usize = 20;

/// A random 20-character alphanumeric id (about 119 bits of entropy).
pub fn auto_id() -> String {
    let mut rng = rand::thread_rng();
    (0..AUTO_ID_LENGTH)
        .map(|_| AUTO_ID_ALPHABET[rng.gen_range(0..AUTO_ID_ALPHABET.len())] as char)
        .collect()
}

impl Connection {
    /// Allocate an id for a new document in `collection`.
    ///
    /// Purely local: nothing is written, so the id can be discarded freely.
    pub fn new_id(&self, collection: &str) -> String {
        self.store().new_id(collection)
    }
}
