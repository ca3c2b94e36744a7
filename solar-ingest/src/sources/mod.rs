pub mod electrical_csv_file;

pub use electrical_csv_file::{ChunkStream, CsvChunks, ElectricalCsvFileSource, RawChunk};
