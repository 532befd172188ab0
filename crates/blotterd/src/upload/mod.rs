//! Upload admission gate and streaming file storage.

mod policy;
mod storage;

pub use policy::{
    CUSTODIAL_PHOTO_EXTENSIONS, CUSTODIAL_PHOTO_MAX_BYTES, GEOFILE_EXTENSIONS, GEOFILE_MAX_BYTES,
    UploadCategory, UploadDecision, UploadGate, UploadPolicy, UploadRejection,
    normalised_extension,
};
pub use storage::{
    MULTIPART_ENVELOPE_BYTES, StoredUpload, UploadError, body_limit, receive_upload,
};
