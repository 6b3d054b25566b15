pub(crate) mod hardware_command;
pub(crate) mod hardware_controller;
pub(crate) mod input_worker;
pub(crate) mod serial_link;

pub use hardware_command::HardwareCommand;
pub use hardware_controller::HardwareController;
pub use input_worker::{InputWorker, TransportControl};
pub use serial_link::{HardwareLink, SerialLink};
