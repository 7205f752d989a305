use std::hash::Hash;

use uuid::Uuid;

/// A domain key that maps to a stored document's `_id`.
///
/// `to_document_id` must be injective: two distinct keys never share an id.
pub trait DocumentKey: Clone + Eq + Hash + Send + Sync + 'static {
    fn to_document_id(&self) -> String;

    fn from_document_id(id: &str) -> Option<Self>;
}

impl DocumentKey for Uuid {
    fn to_document_id(&self) -> String {
        self.hyphenated().to_string()
    }

    fn from_document_id(id: &str) -> Option<Self> {
        Uuid::parse_str(id).ok()
    }
}

impl DocumentKey for String {
    fn to_document_id(&self) -> String {
        self.clone()
    }

    fn from_document_id(id: &str) -> Option<Self> {
        Some(id.to_string())
    }
}

macro_rules! integer_key {
    ($($ty:ty),*) => {
        $(
            impl DocumentKey for $ty {
                fn to_document_id(&self) -> String {
                    self.to_string()
                }

                fn from_document_id(id: &str) -> Option<Self> {
                    id.parse().ok()
                }
            }
        )*
    };
}

integer_key!(i32, i64, u32, u64);
