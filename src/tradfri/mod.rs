pub mod client;
pub mod codec;
pub mod color;
pub mod device;
pub mod group;
pub mod response;
