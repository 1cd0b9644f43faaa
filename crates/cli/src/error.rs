use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("could not load repository settings")]
    Config,
    #[display("could not open repository at {_0}")]
    Storage(#[error(not(source))] String),
    #[display("repository update failed")]
    Update,
    #[display("--watch needs a cron schedule (update.on.cron) in the repository settings")]
    NotScheduled,
}
