//! Executable patching, vanilla extraction and image export.
//!
//! # Pipeline
//!
//! 1. **Patch**: parse the base DOL, compile the main code, the project's
//!    enabled codes and its patch blobs into fixed writes, apply them in
//!    order (last write wins).
//! 2. **Resolve**: encode every unbaked asset through an [`AssetCodec`] and
//!    check that each roster file reference resolves.
//! 3. **Tables**: encode the ID tables for the current slot mapping.
//! 4. **Assemble**: stream every file into a new image next to the output,
//!    then rename it into place.
//!
//! # Architecture
//!
//! - `dol.rs` - DOL section map and RAM address translation
//! - `gecko.rs` - Gecko code list parsing (text and GCT)
//! - `install.rs` - Code installation and addon code loading
//! - `extract.rs` - Vanilla project extraction
//! - `tables.rs` - ID table encoding and decoding
//! - `codec.rs` - Asset codec seam
//! - `progress.rs` - Export steps, progress and cancellation
//! - `export.rs` - Export pipeline and background export
//! - `error.rs` - Error types with user-friendly messages

mod codec;
pub mod dol;
mod error;
mod export;
mod extract;
pub mod gecko;
mod install;
mod progress;
mod tables;

pub use codec::{AssetCodec, CodecError, PassthroughCodec};
pub use error::{BuildError, Result};
pub use export::{
    ExportHandle, ExportJob, ExportSummary, ExportUpdate, ImageLayout, export,
    read_embedded_project, spawn_export,
};
pub use extract::extract_vanilla;
pub use install::{
    CodeSet, InstallReport, Overlap, install, load_addon_codes, load_main_code, project_codes,
};
pub use progress::{CancelToken, ExportProgress, ExportStep};
pub use tables::{
    FLAG_EXTENDED, FLAG_FOLLOWER, FLAG_TRANSFORM, IdTable, IdTables, TableRow, read_id_tables,
    write_id_tables,
};
