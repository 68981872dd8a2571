pub mod history;
pub mod init;
pub mod inspect;
pub mod load;
pub mod platforms;

pub use history::*;
pub use init::*;
pub use inspect::*;
pub use load::*;
pub use platforms::*;
