//! Core data types: book records and the values they carry

mod cover;
mod id;
mod location;
mod record;
mod toc;

pub use cover::CoverImage;
pub use id::{compute_id, BookId, BOOK_ID_LEN};
pub use location::LocationToken;
pub use record::{title_from_filename, BookRecord};
pub use toc::{strip_fragment, TocEntry};

/// Base64 serialization for binary data
pub(crate) mod base64_serde {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
