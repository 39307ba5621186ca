//! Track metadata handling for `AirPlay` receiver
//!
//! Parses DMAP (Digital Media Access Protocol) encoded metadata from `SET_PARAMETER`
//! requests and tracks the `mper` persistent-item id that gates cover-art delivery and
//! full-vs-merge metadata resets.

/// Track metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    /// Track title
    pub title: Option<String>,
    /// Artist name
    pub artist: Option<String>,
    /// Album name
    pub album: Option<String>,
    /// Genre
    pub genre: Option<String>,
    /// Persistent item id (`mper`), opaque beyond equality
    pub mper: Option<u64>,
}

/// DMAP tag codes for metadata
pub(crate) mod dmap_tags {
    pub const ITEM_NAME: &[u8] = b"minm"; // Title
    pub const ITEM_ARTIST: &[u8] = b"asar"; // Artist
    pub const ITEM_ALBUM: &[u8] = b"asal"; // Album
    pub const ITEM_GENRE: &[u8] = b"asgn"; // Genre
    pub const PERSISTENT_ID: &[u8] = b"mper"; // Persistent item id
    pub const LISTING_ITEM: &[u8] = b"mlit"; // Wrapper header, skipped if leading
}

/// Outcome of applying a freshly parsed [`TrackMetadata`] against the previously known
/// `mper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataApplyKind {
    /// `mper` differs from (or introduces) the prior value: replace the current item
    /// wholesale.
    Reset,
    /// `mper` is unchanged: merge fields into the current item.
    Merge,
}

/// Decide whether applying `new` against `previous_mper` is a reset or a merge.
#[must_use]
pub fn apply_kind(new: &TrackMetadata, previous_mper: Option<u64>) -> MetadataApplyKind {
    if new.mper.is_some() && new.mper != previous_mper {
        MetadataApplyKind::Reset
    } else {
        MetadataApplyKind::Merge
    }
}

/// Parse DMAP metadata from binary data
///
/// If the body's first block is `mlit`, its header is skipped and the remaining bytes
/// are parsed as the concatenated field list (the DMAP wrapper carries no fields of its
/// own here).
///
/// # Errors
/// Returns `MetadataError::InvalidFormat` if the DMAP data structure is corrupted or invalid.
/// Returns `MetadataError::IncompleteData` if the data buffer ends unexpectedly.
pub fn parse_dmap_metadata(data: &[u8]) -> Result<TrackMetadata, MetadataError> {
    let mut metadata = TrackMetadata::default();
    let mut offset = skip_leading_mlit(data);

    while offset + 8 <= data.len() {
        // DMAP format: 4-byte tag, 4-byte length, data
        let tag = &data[offset..offset + 4];
        let length = u32::from_be_bytes([
            data[offset + 4],
            data[offset + 5],
            data[offset + 6],
            data[offset + 7],
        ]) as usize;

        offset += 8;

        let end_offset = offset
            .checked_add(length)
            .ok_or(MetadataError::InvalidFormat)?;

        if end_offset > data.len() {
            return Err(MetadataError::IncompleteData);
        }

        let value = &data[offset..end_offset];
        offset = end_offset;

        match tag {
            t if t == dmap_tags::ITEM_NAME => {
                metadata.title = Some(String::from_utf8_lossy(value).into_owned());
            }
            t if t == dmap_tags::ITEM_ARTIST => {
                metadata.artist = Some(String::from_utf8_lossy(value).into_owned());
            }
            t if t == dmap_tags::ITEM_ALBUM => {
                metadata.album = Some(String::from_utf8_lossy(value).into_owned());
            }
            t if t == dmap_tags::ITEM_GENRE => {
                metadata.genre = Some(String::from_utf8_lossy(value).into_owned());
            }
            t if t == dmap_tags::PERSISTENT_ID && length >= 8 => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&value[..8]);
                metadata.mper = Some(u64::from_be_bytes(bytes));
            }
            _ => {
                // Unknown tag, skip
            }
        }
    }

    Ok(metadata)
}

/// Length of the `mlit` header to skip if the body leads with one, else 0.
fn skip_leading_mlit(data: &[u8]) -> usize {
    if data.len() >= 8 && &data[0..4] == dmap_tags::LISTING_ITEM {
        8
    } else {
        0
    }
}

/// Errors parsing DMAP metadata
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// Invalid DMAP structure or format
    #[error("Invalid DMAP format")]
    InvalidFormat,

    /// Data buffer ended unexpectedly
    #[error("Incomplete data")]
    IncompleteData,
}
