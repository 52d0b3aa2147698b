pub mod dispatch;
pub mod upload;
pub mod worker;
