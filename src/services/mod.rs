pub mod bridge;
pub mod clipboard_poller;
pub mod directory_watcher;
pub mod image_transfer;
pub mod pasteboard;
pub mod target_paster;

pub use bridge::Bridge;
pub use clipboard_poller::ClipboardPoller;
pub use directory_watcher::DirectoryWatcher;
pub use image_transfer::ImageTransferService;
pub use pasteboard::create_pasteboard;
pub use target_paster::create_target_paster;
