//! Replay file storage with Zstd compression.
//!
//! Replays are stored as compressed binary files in `{replay_dir}/{hash}.r`.
//! Data is serialized with `bincode` before compression to minimize size.
//! The hash is the MD5 of the serialized payload, so identical uploads share
//! one file.

use crate::models::replay::ReplayData;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zstd::stream::{decode_all, encode_all};

const COMPRESSION_LEVEL: i32 = 19;

fn invalid_data(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("{}: {}", context, e),
    )
}

/// Get the path for a replay file given its hash.
pub fn replay_path(dir: &Path, hash: &str) -> PathBuf {
    dir.join(format!("{}.r", hash))
}

fn encode(data: &ReplayData) -> std::io::Result<Vec<u8>> {
    bincode::serde::encode_to_vec(data, bincode::config::standard())
        .map_err(|e| invalid_data("Serialization error", e))
}

/// Save replay data to a compressed binary file.
/// Returns the content hash the file is stored under.
pub fn save_replay(dir: &Path, data: &ReplayData) -> std::io::Result<String> {
    fs::create_dir_all(dir)?;

    let binary_data = encode(data)?;
    let hash = format!("{:x}", md5::compute(&binary_data));

    if replay_exists(dir, &hash) {
        return Ok(hash);
    }

    let compressed_data = encode_all(&binary_data[..], COMPRESSION_LEVEL)?;
    let mut file = File::create(replay_path(dir, &hash))?;
    file.write_all(&compressed_data)?;

    log::debug!(
        "RECORDS: Stored replay {} ({} presses, {} bytes)",
        hash,
        data.press_count(),
        compressed_data.len()
    );
    Ok(hash)
}

/// Load and decompress replay data from file.
pub fn load_replay(dir: &Path, hash: &str) -> std::io::Result<ReplayData> {
    load_replay_from_path(&replay_path(dir, hash))
}

/// Load replay data from a specific path.
pub fn load_replay_from_path(path: &Path) -> std::io::Result<ReplayData> {
    let file = File::open(path)?;

    let binary_data = decode_all(file)?;

    let (data, _len): (ReplayData, usize) =
        bincode::serde::decode_from_slice(&binary_data, bincode::config::standard())
            .map_err(|e| invalid_data("Deserialization error", e))?;

    Ok(data)
}

/// Delete a replay file. Missing files are not an error.
pub fn delete_replay(dir: &Path, hash: &str) -> std::io::Result<()> {
    let path = replay_path(dir, hash);
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

pub fn replay_exists(dir: &Path, hash: &str) -> bool {
    replay_path(dir, hash).exists()
}
