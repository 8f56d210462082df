pub mod traits;
pub mod io;
pub mod mqtt;
pub mod line_serial;
pub mod hex_serial;
pub mod gpio;
pub mod dummy;
