// Artifact paths - Where each stage writes its output, and content hashes
// All names derive from the dataset base name

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Output files for one dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub frame_log: PathBuf,
    pub score: PathBuf,
    pub sound: PathBuf,
    pub movie: PathBuf,
    /// Movie with the sound track muxed in
    pub movie_with_sound: PathBuf,
}

impl ArtifactPaths {
    pub fn new(output_dir: &Path, base_name: &str) -> Self {
        ArtifactPaths {
            frame_log: output_dir.join(format!("{}.frames.jsonl", base_name)),
            score: output_dir.join(format!("{}.sco", base_name)),
            sound: output_dir.join(format!("{}.wav", base_name)),
            movie: output_dir.join(format!("{}.mp4", base_name)),
            movie_with_sound: output_dir.join(format!("{}sound.mp4", base_name)),
        }
    }

    /// Create the output directory if needed
    pub fn prepare(&self) -> io::Result<()> {
        if let Some(parent) = self.frame_log.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    pub fn all(&self) -> [&Path; 5] {
        [
            &self.frame_log,
            &self.score,
            &self.sound,
            &self.movie,
            &self.movie_with_sound,
        ]
    }
}

/// Content hash of a produced file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactHash {
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: u64,
}

/// Hash a file without loading it into memory
pub fn hash_file(path: &Path) -> io::Result<ArtifactHash> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let bytes = io::copy(&mut file, &mut hasher)?;
    Ok(ArtifactHash {
        path: path.to_path_buf(),
        sha256: hex::encode(hasher.finalize()),
        bytes,
    })
}

/// Hash every artifact that exists on disk
pub fn hash_existing(paths: &ArtifactPaths) -> io::Result<Vec<ArtifactHash>> {
    let mut hashes = Vec::new();
    for path in paths.all() {
        if path.exists() {
            let hash = hash_file(path)?;
            log::info!("{} sha256={} ({} bytes)", path.display(), hash.sha256, hash.bytes);
            hashes.push(hash);
        }
    }
    Ok(hashes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_hash_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hello.txt");
        fs::write(&path, b"hello world").unwrap();

        let hash = hash_file(&path).unwrap();
        assert_eq!(hash.sha256, HELLO_SHA256);
        assert_eq!(hash.bytes, 11);
    }

    #[test]
    fn test_paths_follow_base_name() {
        let paths = ArtifactPaths::new(Path::new("out"), "hurdat_2005");
        assert_eq!(paths.score, PathBuf::from("out/hurdat_2005.sco"));
        assert_eq!(paths.sound, PathBuf::from("out/hurdat_2005.wav"));
        assert_eq!(paths.movie, PathBuf::from("out/hurdat_2005.mp4"));
        assert_eq!(paths.movie_with_sound, PathBuf::from("out/hurdat_2005sound.mp4"));
    }

    #[test]
    fn test_hash_existing_skips_missing_files() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::new(&temp_dir.path().join("nested"), "storms");
        paths.prepare().unwrap();
        fs::write(&paths.score, b"hello world").unwrap();

        let hashes = hash_existing(&paths).unwrap();
        assert_eq!(hashes.len(), 1);
        assert_eq!(hashes[0].path, paths.score);
        assert_eq!(hashes[0].bytes, 11);
        assert_eq!(hashes[0].sha256, HELLO_SHA256);
    }
}
