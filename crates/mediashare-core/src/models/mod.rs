mod media;

pub use media::{MediaRecord, MediaType, RecordPatch, TypeFilter};
