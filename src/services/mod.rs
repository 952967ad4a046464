//! Service layer separating file and codec I/O from the compositing stages

pub mod format;
pub mod io;

pub use format::OutputFormatHandler;
pub use io::ImageIOService;
