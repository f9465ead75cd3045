//! Progress sink abstraction
//!
//! A progress sink receives response parts in the order they become available.
//! Reporting may fail (e.g. the consumer went away); callers decide whether that
//! is fatal.

use crate::{Error, Result, chat::ResponsePart};
use tokio::sync::mpsc;

pub trait ProgressSink: Send {
    /// Deliver one response part
    fn report(&mut self, part: ResponsePart) -> Result<()>;
}

/// Collects parts in memory
impl ProgressSink for Vec<ResponsePart> {
    fn report(&mut self, part: ResponsePart) -> Result<()> {
        self.push(part);
        Ok(())
    }
}

/// Forwards parts to an async consumer
impl ProgressSink for mpsc::UnboundedSender<ResponsePart> {
    fn report(&mut self, part: ResponsePart) -> Result<()> {
        self.send(part)
            .map_err(|_| Error::Sink("receiver dropped".to_string()))
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for &mut S {
    fn report(&mut self, part: ResponsePart) -> Result<()> {
        (**self).report(part)
    }
}
