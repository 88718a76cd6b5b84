//! # Route Modules
//!
//! | Route | Handler |
//! |---|---|
//! | `PUT /upload/{*path}` | [`blobs::upload`] |
//! | `GET /download/{*path}` | [`blobs::download`] |

pub mod blobs;
