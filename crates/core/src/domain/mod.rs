pub mod attachment;
pub mod category;
pub mod request;
pub mod user;
