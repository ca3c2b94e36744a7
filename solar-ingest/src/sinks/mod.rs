pub mod electrical_store;

pub use electrical_store::ElectricalStoreSink;
