use block_dev::DeviceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not a valid volume: {0}")]
    InvalidFormat(&'static str),

    #[error(transparent)]
    Io(#[from] DeviceError),

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("file already exists")]
    AlreadyExists,

    #[error("no such file")]
    NotFound,

    #[error("root directory is full")]
    CatalogFull,

    #[error("file is still open")]
    FileBusy,

    #[error("too many open files")]
    TooManyOpenFiles,

    #[error("bad file descriptor")]
    InvalidDescriptor,

    #[error("offset is beyond the end of file")]
    OffsetOutOfRange,

    #[error("no free data block left")]
    NoSpace,

    #[error("files are still open")]
    FilesStillOpen,
}

pub type Result<T> = core::result::Result<T, Error>;
