//! Cross-process locking and atomic writes for collection documents
//!
//! Every read-modify-write of a `.teamtask/<collection>.json` document holds
//! an exclusive fs2 lock on a `<collection>.lock` sibling. Documents are
//! replaced by writing a temporary sibling and renaming it into place.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use ulid::Ulid;

use crate::error::{Error, Result};

/// How long a writer waits for a collection lock
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Exclusive lock guarding one document; released on drop
#[derive(Debug)]
pub struct DocumentLock {
    file: File,
}

impl DocumentLock {
    /// Lock the document at `document`, polling until `timeout_ms` passes.
    pub fn acquire(document: &Path, timeout_ms: u64) -> Result<Self> {
        let lock_path = lock_path_for(document);
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { file }),
                Err(err) if is_contended(&err) => {
                    if Instant::now() >= deadline {
                        tracing::warn!(lock = %lock_path.display(), "timed out waiting for lock");
                        return Err(Error::LockFailed(lock_path));
                    }
                    std::thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(err) => return Err(Error::Io(err)),
            }
        }
    }
}

impl Drop for DocumentLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn is_contended(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    // fs2 reports Windows sharing violations as "Other".
    cfg!(windows) && matches!(err.raw_os_error(), Some(32) | Some(33))
}

/// `tasks.json` is guarded by `tasks.lock`
pub fn lock_path_for(document: &Path) -> PathBuf {
    document.with_extension("lock")
}

/// Replace `path` with `data` through a temporary sibling and a rename.
///
/// Takes no lock of its own.
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension(format!("tmp-{}", Ulid::new()));
    let mut temp = File::create(&temp_path)?;
    temp.write_all(data)?;
    temp.sync_all()?;
    drop(temp);

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn lock_file_sits_next_to_document() {
        assert_eq!(
            lock_path_for(Path::new("/w/.teamtask/tasks.json")),
            PathBuf::from("/w/.teamtask/tasks.lock")
        );
    }

    #[test]
    fn second_writer_times_out_while_lock_is_held() {
        let dir = TempDir::new().expect("tempdir");
        let document = dir.path().join("tasks.json");

        let held = DocumentLock::acquire(&document, 1000).expect("first lock");
        assert!(matches!(
            DocumentLock::acquire(&document, 50),
            Err(Error::LockFailed(_))
        ));

        drop(held);
        DocumentLock::acquire(&document, 50).expect("lock after release");
    }

    #[test]
    fn atomic_write_replaces_contents_and_leaves_no_temp_files() {
        let dir = TempDir::new().expect("tempdir");
        let document = dir.path().join("users.json");

        write_atomic(&document, b"[]").expect("write");
        write_atomic(&document, b"[1]").expect("rewrite");
        assert_eq!(fs::read_to_string(&document).expect("read"), "[1]");

        let entries = fs::read_dir(dir.path()).expect("read_dir").count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn writers_are_serialized() {
        let dir = TempDir::new().expect("tempdir");
        let document = dir.path().join("notifications.json");

        let threads = 6;
        let barrier = Arc::new(Barrier::new(threads));
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                let inside = Arc::clone(&inside);
                let peak = Arc::clone(&peak);
                let document = document.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let _lock = DocumentLock::acquire(&document, 2000).expect("lock");
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("join");
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
