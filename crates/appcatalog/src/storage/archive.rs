//! Gzipped tarball packing for compressed downloads

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::Read;

use crate::application_id::ApplicationId;
use crate::bundle::FileInfo;

use super::StorageError;

/// File name of the packed download, e.g. `widgets-1.0.tar.gz`
pub fn archive_name(id: &ApplicationId) -> String {
    format!("{}-{}.tar.gz", id.application_name, id.tag)
}

/// Pack a file set into a single gzipped tarball entry
pub fn compress(id: &ApplicationId, files: &[FileInfo]) -> Result<FileInfo, StorageError> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

    for file in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(file.content.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, &file.path, file.content.as_slice())?;
    }

    let encoder = builder.into_inner()?;
    let bytes = encoder.finish()?;
    Ok(FileInfo::new(archive_name(id), bytes))
}

/// Unpack a tarball produced by [`compress`]
pub fn extract(bytes: &[u8]) -> Result<Vec<FileInfo>, StorageError> {
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    let mut files = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_string_lossy().replace('\\', "/");
        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        files.push(FileInfo::new(path, content));
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_and_extract() {
        let id = ApplicationId::new("acme", "widgets", "1.0");
        let files = vec![
            FileInfo::new("metadata.yaml", "name: Widgets"),
            FileInfo::new("templates/deployment.yaml", "kind: Deployment"),
        ];

        let packed = compress(&id, &files).unwrap();
        assert_eq!(packed.path, "widgets-1.0.tar.gz");
        assert_eq!(&packed.content[..2], &[0x1f, 0x8b]);

        let unpacked = extract(&packed.content).unwrap();
        assert_eq!(unpacked, files);
    }
}
