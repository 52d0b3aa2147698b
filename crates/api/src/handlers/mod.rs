pub mod dispatch;
pub mod upload;
