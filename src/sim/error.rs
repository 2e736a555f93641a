use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Discard layer error: {0}")]
    Discard(#[from] crate::discard::DiscardError),

    #[error("Stack error: {0}")]
    Stack(#[from] crate::stack::StackError),
}

pub type SimResult<T> = Result<T, SimError>;
