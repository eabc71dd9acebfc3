//! Common models: virtual schemas, expressions, query context

pub mod context;
pub mod expression;
pub mod function;
pub mod schema;
pub mod stream;

pub use context::{CancelHandle, QueryContext};
pub use expression::{ColumnSource, Expr, ExprBuilder};
pub use function::{FunctionContext, PinnedRefs};
pub use schema::{ColumnDef, RowView, VirtualSchema};
pub use stream::{CheckedStream, RowProducer, RowStream};
