//! The root of a VSS database tree (Component G): loads `srcsafe.ini`,
//! resolves physical names to on-disk paths, and caches the opened item
//! files and the names file.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use encoding_rs::Encoding;

use crate::error::{Error, Result};
use crate::fullname::{PhysicalName, VssName};
use crate::ini::Ini;
use crate::item_file::file::{FileItem, FileItemSource};
use crate::item_file::project::ProjectItem;
use crate::item_file::ItemFile;
use crate::name_file::NameFile;
use crate::options::ParseOptions;

const DEFAULT_DATA_PATH: &str = "data";
const NAMES_FILE: &str = "names.dat";
const INI_FILE: &str = "srcsafe.ini";

/// Parameters a [`Database`] is opened with: the root directory of the
/// VSS tree and the single-byte code page its strings are stored in.
pub struct Database {
    root_path: PathBuf,
    data_path: PathBuf,
    encoding: &'static Encoding,
    options: ParseOptions,
    names: NameFile,
    projects: RefCell<HashMap<PhysicalName, Rc<ProjectItem>>>,
    files: RefCell<HashMap<PhysicalName, Rc<FileItem>>>,
}

impl Database {
    pub fn open(root_path: impl AsRef<Path>, encoding: &'static Encoding, options: ParseOptions) -> Result<Database> {
        let root_path = root_path.as_ref().to_path_buf();
        let ini_path = root_path.join(INI_FILE);
        let ini = if ini_path.exists() {
            Ini::load(&ini_path)?
        } else {
            Ini::default()
        };
        let data_path = root_path.join(ini.get_or("Data_Path", DEFAULT_DATA_PATH));

        let names_path = data_path.join(NAMES_FILE);
        let names_bytes = std::fs::read(&names_path).map_err(|_| Error::VssFileNotFound(names_path))?;
        let names = NameFile::new(Rc::from(names_bytes.into_boxed_slice()), options, encoding);

        Ok(Database {
            root_path,
            data_path,
            encoding,
            options,
            names,
            projects: RefCell::new(HashMap::new()),
            files: RefCell::new(HashMap::new()),
        })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn options(&self) -> ParseOptions {
        self.options
    }

    /// `Data_Path / (physical_name[0].lower() if bucket) / physical_name`.
    pub fn data_path(&self, physical_name: PhysicalName, bucket: bool) -> PathBuf {
        if bucket {
            self.data_path
                .join(physical_name.bucket().to_string())
                .join(physical_name.as_str().as_ref())
        } else {
            self.data_path.join(physical_name.as_str().as_ref())
        }
    }

    /// Reads the content/data file for `physical_name` with the given
    /// one-letter extension (the item header's `data_ext`).
    pub fn open_data_file(&self, physical_name: PhysicalName, ext: u8) -> Result<Rc<[u8]>> {
        let base = self.data_path(physical_name, true);
        let path = base.with_extension((ext as char).to_string());
        let bytes = std::fs::read(&path).map_err(|_| Error::VssFileNotFound(path))?;
        Ok(Rc::from(bytes.into_boxed_slice()))
    }

    fn open_item_bytes(&self, physical_name: PhysicalName, bucket: bool) -> Result<Rc<[u8]>> {
        let path = self.data_path(physical_name, bucket);
        let bytes = std::fs::read(&path).map_err(|_| Error::VssFileNotFound(path))?;
        Ok(Rc::from(bytes.into_boxed_slice()))
    }

    /// Opens (or returns the cached) project item file for
    /// `physical_name`.
    pub fn open_project(&self, physical_name: PhysicalName) -> Result<Rc<ProjectItem>> {
        if let Some(cached) = self.projects.borrow().get(&physical_name) {
            return Ok(Rc::clone(cached));
        }
        let bytes = self.open_item_bytes(physical_name, true)?;
        let item = ItemFile::open(physical_name, bytes, self.options, self.encoding)?;
        let project = Rc::new(ProjectItem::new(item));
        self.projects.borrow_mut().insert(physical_name, Rc::clone(&project));
        Ok(project)
    }

    /// Opens (or returns the cached) file item file for `physical_name`,
    /// eagerly reconstructing its revision contents from its current
    /// data file.
    pub fn open_file(&self, physical_name: PhysicalName) -> Result<Rc<FileItem>> {
        if let Some(cached) = self.files.borrow().get(&physical_name) {
            return Ok(Rc::clone(cached));
        }
        let bytes = self.open_item_bytes(physical_name, true)?;
        let item = ItemFile::open(physical_name, bytes, self.options, self.encoding)?;
        let ext = item.header.data_ext;
        let file = FileItem::new(item);
        let latest_bytes = self.open_data_file(physical_name, ext)?;
        file.build_revisions(&latest_bytes)?;
        let file = Rc::new(file);
        self.files.borrow_mut().insert(physical_name, Rc::clone(&file));
        Ok(file)
    }

    /// The root project, default physical name `AAAAAAAA`.
    pub fn open_root_project(&self) -> Result<Rc<ProjectItem>> {
        self.open_project(PhysicalName::ROOT)
    }

    pub fn long_name(&self, name: &VssName) -> Result<String> {
        self.names.get_long_name(name, self.encoding)
    }

    pub fn names(&self) -> &NameFile {
        &self.names
    }
}

impl FileItemSource for Database {
    fn open_file_item(&self, physical_name: PhysicalName) -> Result<Rc<FileItem>> {
        self.open_file(physical_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment_record_names_dat() -> Vec<u8> {
        // An empty name table (count = 0).
        let payload = 0u16.to_le_bytes().to_vec();
        let mut rec = Vec::new();
        rec.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        rec.push(b'N');
        rec.push(b'M');
        let crc = crate::crc::crc16(&payload);
        rec.extend_from_slice(&crc.to_le_bytes());
        rec.extend_from_slice(&payload);
        rec
    }

    #[test]
    fn data_path_defaults_to_data_and_resolves_ini_override() {
        let dir = tempdir();
        std::fs::write(dir.join(INI_FILE), b"Data_Path = altdata\n").unwrap();
        let alt = dir.join("altdata");
        std::fs::create_dir_all(&alt).unwrap();
        std::fs::write(alt.join(NAMES_FILE), comment_record_names_dat()).unwrap();

        let db = Database::open(&dir, encoding_rs::WINDOWS_1252, ParseOptions::default()).unwrap();
        assert_eq!(db.data_path, alt);
        cleanup(&dir);
    }

    #[test]
    fn missing_names_file_is_vss_file_not_found() {
        let dir = tempdir();
        let result = Database::open(&dir, encoding_rs::WINDOWS_1252, ParseOptions::default());
        assert!(matches!(result, Err(Error::VssFileNotFound(_))));
        cleanup(&dir);
    }

    fn tempdir() -> PathBuf {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut dir = std::env::temp_dir();
        dir.push(format!("vss-reader-test-{}-{n}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = std::fs::remove_dir_all(dir);
    }
}
