use crc32fast::Hasher;
use std::{
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
};

pub fn file_hash(file: &mut File) -> Result<u32, std::io::Error> {
    let mut hasher = Hasher::new();
    let mut buffer = [0; 4096];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hasher.finalize())
}

pub fn walk_recursive<F>(folder: &Path, filter_fn: Option<F>) -> Result<Vec<PathBuf>, std::io::Error>
where
    F: Fn(&Path) -> bool + Copy,
{
    let mut local_paths = Vec::new();
    let dir = fs::read_dir(folder)?;
    for entry in dir {
        let path = entry?.path();
        if path.is_file() {
            match filter_fn {
                Some(filter_fn) if filter_fn(&path) => local_paths.push(path),
                Some(_) => {}
                None => local_paths.push(path),
            }
        } else if path.is_dir() {
            local_paths.append(&mut walk_recursive(&path, filter_fn)?);
        }
    }
    Ok(local_paths)
}

pub async fn clear_directory(dir: impl AsRef<Path>) -> Result<usize, io::Error> {
    let mut removed_files = 0;
    let mut directory = tokio::fs::read_dir(dir).await?;
    while let Ok(Some(entry)) = directory.next_entry().await {
        if tokio::fs::remove_file(entry.path()).await.is_ok() {
            removed_files += 1;
        } else {
            tracing::error!(path = ?entry.path(), "failed to remove file");
        }
    }
    Ok(removed_files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_recursive_finds_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("nested/b.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("nested/c.txt"), b"x").unwrap();

        let found = walk_recursive(
            dir.path(),
            Some(|p: &Path| p.extension().is_some_and(|e| e == "mp4")),
        )
        .unwrap();
        assert_eq!(found.len(), 2);
    }
}
