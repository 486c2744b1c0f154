pub mod analysis;
pub mod feedback;
pub mod lenient;
pub mod log;
pub mod session;

pub use analysis::*;
pub use feedback::*;
pub use log::*;
pub use session::*;
