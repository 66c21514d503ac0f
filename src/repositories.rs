pub mod attribution;
pub mod pix;
pub mod tracking;
