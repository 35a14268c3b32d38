mod home;
mod logs;
mod report;
mod system;

pub use home::home;
pub use logs::logs;
pub use report::{DownloadParams, download, generate};
pub use system::health;
