//! Job data archive codec.
//!
//! Packs a set of object-storage prefixes into one deflate-compressed
//! zip archive for transmission to the remote compute service, and
//! unpacks a result archive back into object storage.
//!
//! Packing is best-effort: a prefix that fails to list or an object
//! that fails to download is logged and skipped, and a partial archive
//! is shipped. Unpacking is all-or-nothing: it gates the finalization
//! state transition, so corruption or an upload failure must surface
//! as a hard error.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::{ObjectStorage, StorageError};

/// Errors from the archive codec.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The archive bytes are not a valid zip.
    #[error("malformed archive: {0}")]
    Malformed(#[from] zip::result::ZipError),

    /// Reading or writing archive entries failed.
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Object storage failed while unpacking.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Pack all objects under the given storage prefixes into a single
/// archive.
///
/// Entry names are the object paths with the owning prefix stripped
/// and any leading slash removed; entry order is listing order.
pub async fn pack(
    storage: &dyn ObjectStorage,
    prefixes: &[String],
) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for prefix in prefixes {
        let paths = match storage.list(prefix).await {
            Ok(paths) => paths,
            Err(err) => {
                tracing::error!(prefix = %prefix, error = %err, "Listing storage prefix failed, skipping");
                continue;
            }
        };
        for path in paths {
            let data = match storage.download(&path).await {
                Ok(data) => data,
                Err(err) => {
                    tracing::error!(path = %path, error = %err, "Downloading object failed, skipping");
                    continue;
                }
            };
            writer.start_file(entry_name(&path, prefix), options)?;
            writer.write_all(&data)?;
        }
    }
    Ok(writer.finish()?.into_inner())
}

/// Unpack a result archive into object storage under `dest_prefix`.
///
/// Returns the full list of resulting storage paths in enumeration
/// order. Explicit directory entries carry no data and are skipped.
pub async fn unpack(
    storage: &dyn ObjectStorage,
    archive: &[u8],
    dest_prefix: &str,
) -> Result<Vec<String>, ArchiveError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;
    tracing::info!(entries = zip.len(), "Unpacking result archive");

    let mut uploaded = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        // The entry borrow must end before the upload await point.
        let entry = {
            let mut file = zip.by_index(index)?;
            if file.is_dir() {
                None
            } else {
                let mut data = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut data)?;
                Some((file.name().to_string(), data))
            }
        };
        if let Some((name, data)) = entry {
            let dest = format!("{}/{}", dest_prefix, name.trim_start_matches('/'));
            storage.upload(&dest, data, None).await?;
            uploaded.push(dest);
        }
    }
    Ok(uploaded)
}

fn entry_name(path: &str, prefix: &str) -> String {
    path.replacen(prefix, "", 1)
        .trim_start_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::memory::MemStorage;

    #[tokio::test]
    async fn pack_then_unpack_round_trips_objects() {
        let storage = MemStorage::new();
        storage
            .upload("alice/in/a.txt", b"alpha".to_vec(), None)
            .await
            .unwrap();
        storage
            .upload("alice/in/sub/b.bin", vec![0, 1, 2, 255], None)
            .await
            .unwrap();

        let bytes = pack(&storage, &["alice/in".to_string()]).await.unwrap();
        let paths = unpack(&storage, &bytes, "bob/out").await.unwrap();

        assert_eq!(paths, vec!["bob/out/a.txt", "bob/out/sub/b.bin"]);
        assert_eq!(storage.download("bob/out/a.txt").await.unwrap(), b"alpha");
        assert_eq!(
            storage.download("bob/out/sub/b.bin").await.unwrap(),
            vec![0, 1, 2, 255]
        );
    }

    #[tokio::test]
    async fn pack_of_unknown_prefix_yields_empty_archive() {
        let storage = MemStorage::new();
        let bytes = pack(&storage, &["nothing/here".to_string()]).await.unwrap();
        let unpacked = unpack(&storage, &bytes, "dest").await.unwrap();
        assert!(unpacked.is_empty());
    }

    #[tokio::test]
    async fn unpack_of_garbage_is_a_hard_error() {
        let storage = MemStorage::new();
        let err = unpack(&storage, b"definitely not a zip", "dest")
            .await
            .unwrap_err();
        assert_matches!(err, ArchiveError::Malformed(_));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn entry_names_strip_prefix_and_leading_slash() {
        assert_eq!(entry_name("alice/in/a.txt", "alice/in"), "a.txt");
        assert_eq!(entry_name("/alice/in/a.txt", "/alice/in"), "a.txt");
    }
}
