// Picker Kernel
//
// Durable, ordered image collection for the photo picker.

pub mod config;
pub mod gallery;
pub mod record;
pub mod store;
pub mod worker;
