//! Block id generation.

/// Characters used for the random suffix of generated ids.
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of the random suffix.
const ID_SUFFIX_LEN: usize = 7;

/// Source of fresh block ids for nodes that carry none.
pub trait IdGenerator {
    /// Produce a new id.
    fn new_id(&self) -> String;
}

/// Ids of the form `YYYYMMDDhhmmss-xxxxxxx` built from the local time and a random suffix.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampIdGenerator;

impl IdGenerator for TimestampIdGenerator {
    fn new_id(&self) -> String {
        let mut id = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
        id.push('-');
        for _ in 0..ID_SUFFIX_LEN {
            let i = rand::random_range(0..ID_ALPHABET.len());
            id.push(char::from(ID_ALPHABET[i]));
        }
        id
    }
}

/// Always returns the same id. Used to make output deterministic.
#[derive(Debug, Clone)]
pub struct FixedIdGenerator(pub String);

impl FixedIdGenerator {
    /// The id used throughout the test suites.
    pub const TEST_ID: &'static str = "20060102150405-1a2b3c4";
}

impl Default for FixedIdGenerator {
    fn default() -> Self {
        Self(Self::TEST_ID.to_owned())
    }
}

impl IdGenerator for FixedIdGenerator {
    fn new_id(&self) -> String {
        self.0.clone()
    }
}
