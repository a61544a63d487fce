//! Export string codec.
//!
//! Two layers: [`value`] prints and parses a bounded value tree, and
//! [`transport`] frames the printed text as `LAZYBARS:v1:<base64>`.
//! [`payload`] maps layouts onto the value tree and [`exchange`] applies
//! decoded payloads to application state.

pub mod exchange;
pub mod payload;
pub mod transport;
pub mod value;

pub use exchange::{
    apply_payload, decode_payload, encode_payload, export_full, export_keyframes, export_layout,
    export_template, import_string, ImportReport,
};
pub use payload::{ExportPayload, PayloadData, PayloadKind};
