use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid logical context: {0}")]
    InvalidContext(String),
}

pub type Result<T> = std::result::Result<T, Error>;
