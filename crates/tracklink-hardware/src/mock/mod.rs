//! Mock device implementations for testing and development.
//!
//! Every mock is created together with a handle. The mock goes to the code
//! under test; the handle stays with the test (or the simulator) and drives
//! the mock from outside: presenting cards, moving the vehicle, scripting
//! the radio and inspecting what was played.

pub mod audio;
pub mod card;
pub mod link;
pub mod location;
pub mod watchdog;

// Re-export commonly used types
pub use audio::{MockAudioHandle, MockAudioPlayer};
pub use card::{MockCardReader, MockCardReaderHandle};
pub use link::{MockLink, MockLinkHandle};
pub use location::{MockLocationHandle, MockLocationSource};
pub use watchdog::{MockWatchdog, MockWatchdogHandle};
