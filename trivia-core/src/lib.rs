pub mod catalog;
pub mod guess;
pub mod room;
pub mod scoring;

// Re-export main components
pub use catalog::*;
pub use guess::*;
pub use room::*;
pub use scoring::*;
