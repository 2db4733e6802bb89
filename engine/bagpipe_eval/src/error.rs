//! Engine errors.

use bagpipe_ir::ExprId;

/// Result of evaluating a node or an expression.
pub type EvalResult<T> = Result<T, EvalError>;

/// Evaluation failure.
///
/// `Clone` so that a failed outcome can live in the memo caches (and
/// inside shared futures) exactly like a successful one.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// An `Input` node was evaluated without a collection bound to it.
    #[error("unresolved input: expression {id} was never bound with set()")]
    UnresolvedInput { id: ExprId },
}

impl EvalError {
    /// Id of the node the failure originated at.
    pub fn id(&self) -> ExprId {
        match self {
            EvalError::UnresolvedInput { id } => *id,
        }
    }
}
