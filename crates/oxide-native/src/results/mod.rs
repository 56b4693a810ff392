//! Result-set mappings and row materialization.
//!
//! A [`ResultSetMapping`] is a list of [`ResultBuilder`]s plus to-one
//! [`JoinBuilder`]s. Resolving it against a [`Metamodel`](crate::Metamodel)
//! yields a [`ResolvedMapping`] that a [`RowReader`] applies to each row of
//! a [`RowSource`].

mod builder;
mod mapping;
mod reader;
mod scroll;
mod tuple;
mod typed;
mod value;

pub use builder::{InstantiationArgument, JoinBuilder, PropertyFetch, ResultBuilder, RootBuilder};
pub use mapping::{
    ColumnRef, EntityRead, FetchRead, IdentifierRead, IdentifierSource, ResolvedMapping,
    ResolvedResult, ResultSetMapping, ScalarRead, ValueRead,
};
pub use reader::{CancellationCheck, RowReader, RowSource, VecRowSource};
pub use scroll::ScrollableResults;
pub use tuple::{Tuple, TupleElement};
pub use typed::{FromResultValue, ResultShape};
pub use value::{expect_composite, expect_entity, Composite, EntityInstance, ResultValue};
