pub mod assignment;
pub mod event;
pub mod file;
pub mod scan_result;

pub use assignment::ScannerAssignment;
pub use event::{tree_dict, FileDict, FileEvent, TreeDict};
pub use file::{File, FileId};
pub use scan_result::{FieldValue, ScanResult};
