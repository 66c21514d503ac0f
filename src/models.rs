pub mod attribution;
pub mod pix;
pub mod server;
pub mod tracking;
