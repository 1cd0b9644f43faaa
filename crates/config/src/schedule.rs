use crate::error::{ErrorKind, Result};
use chrono::{DateTime, Utc};
use croner::Cron;
use exn::ResultExt;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};

/// A validated cron expression.
#[derive(Clone)]
pub struct Schedule {
    expression: String,
    cron: Cron,
}

impl Schedule {
    /// # Examples
    ///
    /// ```
    /// use rpmrepo_config::Schedule;
    ///
    /// assert!(Schedule::parse("0 * * * *").is_ok());
    /// assert!(Schedule::parse("every hour").is_err());
    /// ```
    pub fn parse(expression: &str) -> Result<Self> {
        let cron = Cron::new(expression).with_seconds_optional().parse().or_raise(|| ErrorKind::Invalid {
            key: "update.on.cron",
            value: expression.to_string(),
        })?;
        Ok(Self {
            expression: expression.to_string(),
            cron,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First occurrence strictly after `after`, if the expression has any.
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.cron.find_next_occurrence(after, false).ok()
    }
}

impl PartialEq for Schedule {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

impl Eq for Schedule {}

impl Debug for Schedule {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_tuple("Schedule").field(&self.expression).finish()
    }
}

impl Display for Schedule {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.expression)
    }
}
