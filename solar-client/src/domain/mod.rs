pub mod electrical_reading;
pub mod project;

pub use electrical_reading::{ElectricalReading, StoredElectricalReading};
pub use project::{NewProject, NewSystem, Project, System};
