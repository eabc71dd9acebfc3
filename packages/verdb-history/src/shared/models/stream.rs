//! Pull-based row streams handed to the host

use std::iter::FusedIterator;
use tracing::debug;
use verdb_storage::Row;

use super::context::QueryContext;
use crate::errors::Result;

/// Rows of one scan. `None` ends the stream; after an error it stays ended.
pub type RowStream = Box<dyn Iterator<Item = Result<Row>> + Send>;

/// Scan state behind a [`CheckedStream`]
pub trait RowProducer: Send {
    /// Next row, `Ok(None)` at end of data
    fn produce(&mut self) -> Result<Option<Row>>;
}

/// Checks the query context before every row and drops the producer
/// (walker, loader, cached snapshots) as soon as the stream ends.
pub struct CheckedStream<P> {
    ctx: QueryContext,
    producer: Option<P>,
    produced: usize,
}

impl<P: RowProducer> CheckedStream<P> {
    pub fn new(ctx: QueryContext, producer: P) -> Self {
        Self {
            ctx,
            producer: Some(producer),
            produced: 0,
        }
    }

    /// Stream that ends immediately without touching storage
    pub fn empty(ctx: QueryContext) -> Self {
        Self {
            ctx,
            producer: None,
            produced: 0,
        }
    }

    pub fn into_stream(self) -> RowStream
    where
        P: 'static,
    {
        Box::new(self)
    }

    fn finish(&mut self) {
        if self.producer.take().is_some() {
            debug!(rows = self.produced, "scan finished");
        }
    }
}

impl<P: RowProducer> Iterator for CheckedStream<P> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let producer = self.producer.as_mut()?;
        let step = self.ctx.checkpoint().and_then(|()| producer.produce());
        match step {
            Ok(Some(row)) => {
                self.produced += 1;
                Some(Ok(row))
            }
            Ok(None) => {
                self.finish();
                None
            }
            Err(e) => {
                self.finish();
                Some(Err(e))
            }
        }
    }
}

impl<P: RowProducer> FusedIterator for CheckedStream<P> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HistoryError;
    use verdb_storage::Value;

    struct Counter {
        left: i64,
        fail_at: Option<i64>,
    }

    impl RowProducer for Counter {
        fn produce(&mut self) -> Result<Option<Row>> {
            if Some(self.left) == self.fail_at {
                return Err(HistoryError::TypeMismatch("boom".into()));
            }
            if self.left == 0 {
                return Ok(None);
            }
            self.left -= 1;
            Ok(Some(vec![Value::Int(self.left)]))
        }
    }

    #[test]
    fn test_yields_until_exhausted() {
        let stream = CheckedStream::new(QueryContext::new(), Counter { left: 3, fail_at: None });
        assert_eq!(stream.count(), 3);
    }

    #[test]
    fn test_fused_after_error() {
        let mut stream = CheckedStream::new(QueryContext::new(), Counter { left: 3, fail_at: Some(1) });
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_cancel_between_rows() {
        let ctx = QueryContext::new();
        let mut stream = CheckedStream::new(ctx.clone(), Counter { left: 10, fail_at: None });
        assert!(stream.next().unwrap().is_ok());

        ctx.cancel();
        assert!(matches!(stream.next(), Some(Err(HistoryError::Cancelled))));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_empty_stream() {
        let mut stream = CheckedStream::<Counter>::empty(QueryContext::new());
        assert!(stream.next().is_none());
    }
}
