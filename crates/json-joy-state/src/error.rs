use thiserror::Error;

/// Errors returned by state, builder and binder operations.
///
/// Every failing operation reports before it mutates anything, so a returned
/// error always leaves the tree as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// A raw container was written where a wrapped [`State`](crate::State) is required.
    #[error("assigned object must be wrapped by tree_state(...)")]
    UnwrappedAssignment,
    #[error("binder object is not assignable")]
    BinderNotAssignable,
    /// A container was reached again while it was still being visited.
    #[error("cyclic structure detected")]
    CycleDetected,
    #[error("tree root must be an object or an array")]
    NotAContainer,
    #[error("state is not an array")]
    NotArray,
    #[error("key {0:?} is not a valid array index")]
    InvalidIndex(String),
}
