//! Pass-scoped overlay filesystem.
//!
//! Reads fall through to disk and are cached; writes only update the cache.
//! Each cached entry remembers the pre-pass content so the flush stage can
//! diff or write exactly the files whose content changed. Nothing reaches
//! disk before [`VirtualFs::flush`], which consumes the overlay.
//!
//! Paths are normalised lexically (`.` dropped, `..` folded) and are always
//! relative to the repository root. A path that still climbs above the root
//! after folding, or an absolute one, is rejected with
//! [`io::ErrorKind::InvalidInput`]. [`FsView`]s translate paths under a
//! prefix and share the single backing store, so overlapping views observe
//! each other's writes.

use crate::diff;
use crate::format::Formatter;
use crate::logger::{LogMessage, Logger};
use crate::outcome::Outcome;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
struct Entry {
    /// Content on disk before the pass; `None` when the file did not exist.
    original: Option<String>,
    /// Last content read or written during the pass.
    current: Option<String>,
}

impl Entry {
    fn is_touched(&self) -> bool {
        self.current.is_some() && self.current != self.original
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A file whose buffered content differs from its on-disk original.
pub struct TouchedFile {
    pub relative_path: PathBuf,
    pub full_path: PathBuf,
    pub original: Option<String>,
    pub contents: String,
}

impl TouchedFile {
    pub fn is_new(&self) -> bool {
        self.original.is_none()
    }
}

/// Lexically normalise a relative path.
fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                _ => out.push(comp),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Normalised cache key for `path`, refusing anything outside the root.
fn key_of(path: &Path) -> io::Result<PathBuf> {
    let key = normalize(path);
    if key.components().all(|c| matches!(c, Component::Normal(_))) {
        Ok(key)
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} escapes the repository root", path.display()),
        ))
    }
}

/// Buffered read/write view of a repository tree for one pass.
pub struct VirtualFs {
    root: PathBuf,
    entries: RefCell<BTreeMap<PathBuf, Entry>>,
}

impl VirtualFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// View rooted at the repository root.
    pub fn view(&self) -> FsView<'_> {
        FsView {
            fs: self,
            prefix: PathBuf::new(),
        }
    }

    /// View whose paths are relative to `prefix`.
    pub fn scoped(&self, prefix: impl AsRef<Path>) -> FsView<'_> {
        FsView {
            fs: self,
            prefix: normalize(prefix.as_ref()),
        }
    }

    /// Current content of `path`, or `None` when it neither exists on disk
    /// nor was written this pass.
    pub fn read(&self, path: impl AsRef<Path>) -> io::Result<Option<String>> {
        let key = key_of(path.as_ref())?;
        if let Some(entry) = self.entries.borrow().get(&key) {
            log::trace!("vfs: cache hit {}", key.display());
            return Ok(entry.current.clone());
        }
        let on_disk = self.read_disk(&key)?;
        self.entries.borrow_mut().insert(
            key,
            Entry {
                original: on_disk.clone(),
                current: on_disk.clone(),
            },
        );
        Ok(on_disk)
    }

    /// Buffer `contents` for `path`. The first touch snapshots disk content
    /// as the original.
    pub fn write(&self, path: impl AsRef<Path>, contents: impl Into<String>) -> io::Result<()> {
        let key = key_of(path.as_ref())?;
        let cached = self.entries.borrow().contains_key(&key);
        if !cached {
            let original = self.read_disk(&key)?;
            self.entries.borrow_mut().insert(
                key.clone(),
                Entry {
                    original: original.clone(),
                    current: original,
                },
            );
        }
        log::trace!("vfs: write {}", key.display());
        if let Some(entry) = self.entries.borrow_mut().get_mut(&key) {
            entry.current = Some(contents.into());
        }
        Ok(())
    }

    fn read_disk(&self, key: &Path) -> io::Result<Option<String>> {
        match fs::read_to_string(self.root.join(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Files touched so far. Each call starts a fresh pass over a snapshot.
    pub fn touched_files(&self) -> impl Iterator<Item = TouchedFile> + '_ {
        let snapshot = self.entries.borrow().clone();
        snapshot.into_iter().filter_map(move |(key, entry)| {
            if !entry.is_touched() {
                return None;
            }
            Some(TouchedFile {
                full_path: self.root.join(&key),
                relative_path: key,
                original: entry.original,
                contents: entry.current.unwrap_or_default(),
            })
        })
    }

    /// Format, then either write (`dry_run == false`) or report every
    /// touched file. Consumes the overlay.
    ///
    /// Format failures are warnings. Write failures fail the outcome but do
    /// not stop the remaining writes. In dry-run mode every differing file
    /// is reported with a diff and fails the outcome.
    pub fn flush(self, dry_run: bool, formatter: &dyn Formatter, logger: &Logger) -> Outcome {
        let pending: Vec<TouchedFile> = self.touched_files().collect();
        for file in pending {
            match formatter.format(&file.full_path, &file.contents) {
                Ok(formatted) => {
                    if let Some(entry) = self.entries.borrow_mut().get_mut(&file.relative_path) {
                        entry.current = Some(formatted);
                    }
                }
                Err(e) => logger.warn(
                    LogMessage::new(format!("Failed to format {}", file.relative_path.display()))
                        .with_error(&e),
                ),
            }
        }

        let touched: Vec<TouchedFile> = self.touched_files().collect();
        log::debug!("vfs: flushing {} touched file(s), dry_run={}", touched.len(), dry_run);
        if dry_run {
            report_diffs(&touched, logger)
        } else {
            write_files(&touched, logger)
        }
    }
}

fn report_diffs(touched: &[TouchedFile], logger: &Logger) -> Outcome {
    let mut outcome = Outcome::success();
    for file in touched {
        outcome.fail();
        logger.error(
            LogMessage::new(format!(
                "{} differs from expected value",
                file.relative_path.display()
            ))
            .with_content(diff::render(
                file.original.as_deref().unwrap_or(""),
                &file.contents,
            )),
        );
    }
    outcome
}

fn write_files(touched: &[TouchedFile], logger: &Logger) -> Outcome {
    let mut outcome = Outcome::success();
    for file in touched {
        let written = match file.full_path.parent() {
            Some(dir) => fs::create_dir_all(dir),
            None => Ok(()),
        }
        .and_then(|()| fs::write(&file.full_path, &file.contents));
        match written {
            Ok(()) => {
                let verb = if file.is_new() { "Wrote" } else { "Fixed" };
                logger.info(format!("{verb} {}", file.relative_path.display()));
            }
            Err(e) => {
                logger.error(
                    LogMessage::new(format!("Failed to write {}", file.relative_path.display()))
                        .with_error(&e),
                );
                outcome.fail();
            }
        }
    }
    outcome
}

#[derive(Clone)]
/// Path-translating window onto a [`VirtualFs`].
pub struct FsView<'a> {
    fs: &'a VirtualFs,
    prefix: PathBuf,
}

impl<'a> FsView<'a> {
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Path relative to the repository root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        normalize(&self.prefix.join(path))
    }

    /// Absolute path on disk.
    pub fn full_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.fs.root.join(self.resolve(path))
    }

    pub fn read(&self, path: impl AsRef<Path>) -> io::Result<Option<String>> {
        self.fs.read(self.resolve(path))
    }

    pub fn write(&self, path: impl AsRef<Path>, contents: impl Into<String>) -> io::Result<()> {
        self.fs.write(self.resolve(path), contents)
    }

    /// Nested view under `sub`.
    pub fn scoped(&self, sub: impl AsRef<Path>) -> FsView<'a> {
        FsView {
            fs: self.fs,
            prefix: self.resolve(sub),
        }
    }
}
