//! Plan cache keys.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::results::{ResultSetMapping, ResultValue};

/// Builds one row result from the row's values and their aliases.
pub type TupleTransformer =
    dyn Fn(Vec<ResultValue>, &[Option<String>]) -> ResultValue + Send + Sync;

/// Rewrites the complete result list.
pub type ResultListTransformer = dyn Fn(Vec<ResultValue>) -> Vec<ResultValue> + Send + Sync;

/// A shared reference compared by address.
pub struct ByAddress<T: ?Sized>(pub Arc<T>);

impl<T: ?Sized> Clone for ByAddress<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: ?Sized> PartialEq for ByAddress<T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl<T: ?Sized> Eq for ByAddress<T> {}

impl<T: ?Sized> Hash for ByAddress<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0).cast::<()>(), state);
    }
}

impl<T: ?Sized> fmt::Debug for ByAddress<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByAddress({:p})", Arc::as_ptr(&self.0).cast::<()>())
    }
}

/// Identity of a select plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectPlanKey {
    pub sql: String,
    pub mapping: ResultSetMapping,
    pub spaces: BTreeSet<String>,
    pub tuple_transformer: Option<ByAddress<TupleTransformer>>,
    pub list_transformer: Option<ByAddress<ResultListTransformer>>,
}

/// Identity of an update plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonSelectPlanKey {
    pub sql: String,
    pub spaces: BTreeSet<String>,
}
