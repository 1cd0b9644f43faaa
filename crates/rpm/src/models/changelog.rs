/// A `%changelog` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Changelog {
    pub author: String,
    /// Seconds since the Unix epoch
    pub date: u64,
    pub text: String,
}
impl Changelog {
    pub fn new(author: impl Into<String>, date: u64, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            date,
            text: text.into(),
        }
    }
}
