pub mod report;
pub mod snapshot;
pub mod source;
pub mod status;

pub use report::*;
pub use snapshot::*;
pub use source::*;
pub use status::*;
