use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

use crate::error::{Result, StudyError};
use crate::model::StudentProfile;

/// Persistence collaborator holding one complete record per student.
///
/// Writes are full overwrites; there is no locking across processes, so the
/// last writer for a given student wins.
pub trait StudentStore: Send + Sync {
    fn exists(&self, student_id: &str) -> Result<bool>;

    /// Returns `None` for unknown students.
    fn get(&self, student_id: &str) -> Result<Option<StudentProfile>>;

    /// Stores a new profile. Returns `false` without writing if the id is taken.
    fn create(&self, profile: &StudentProfile) -> Result<bool>;

    /// Overwrites an existing profile. Returns `false` if the id is unknown.
    fn update(&self, profile: &StudentProfile) -> Result<bool>;

    fn require(&self, student_id: &str) -> Result<StudentProfile> {
        self.get(student_id)?
            .ok_or_else(|| StudyError::StudentNotFound(student_id.to_string()))
    }

    fn save(&self, profile: &StudentProfile) -> Result<()> {
        if self.update(profile)? {
            Ok(())
        } else {
            Err(StudyError::StudentNotFound(profile.id.clone()))
        }
    }
}

/// One pretty-printed `<student_id>.json` file per student.
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn student_file(&self, student_id: &str) -> Result<PathBuf> {
        let valid = !student_id.is_empty()
            && student_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !student_id.starts_with('.');
        if !valid {
            return Err(StudyError::InvalidProfile(format!("invalid student id '{}'", student_id)));
        }
        Ok(self.data_dir.join(format!("{}.json", student_id)))
    }

    fn write(&self, profile: &StudentProfile) -> Result<()> {
        let path = self.student_file(&profile.id)?;
        let contents = serde_json::to_string_pretty(profile)?;
        std::fs::write(&path, contents)?;
        debug!(student = %profile.id, path = %path.display(), "student record written");
        Ok(())
    }
}

impl StudentStore for JsonFileStore {
    fn exists(&self, student_id: &str) -> Result<bool> {
        Ok(self.student_file(student_id)?.exists())
    }

    fn get(&self, student_id: &str) -> Result<Option<StudentProfile>> {
        let path = self.student_file(student_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn create(&self, profile: &StudentProfile) -> Result<bool> {
        if self.exists(&profile.id)? {
            return Ok(false);
        }
        self.write(profile)?;
        Ok(true)
    }

    fn update(&self, profile: &StudentProfile) -> Result<bool> {
        if !self.exists(&profile.id)? {
            return Ok(false);
        }
        self.write(profile)?;
        Ok(true)
    }
}

/// In-process store, used by tests and ephemeral deployments.
#[derive(Default)]
pub struct MemoryStore {
    students: RwLock<HashMap<String, StudentProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StudyError {
        StudyError::Storage(std::io::Error::new(
            std::io::ErrorKind::Other,
            "student store lock poisoned",
        ))
    }
}

impl StudentStore for MemoryStore {
    fn exists(&self, student_id: &str) -> Result<bool> {
        let students = self.students.read().map_err(|_| Self::poisoned())?;
        Ok(students.contains_key(student_id))
    }

    fn get(&self, student_id: &str) -> Result<Option<StudentProfile>> {
        let students = self.students.read().map_err(|_| Self::poisoned())?;
        Ok(students.get(student_id).cloned())
    }

    fn create(&self, profile: &StudentProfile) -> Result<bool> {
        let mut students = self.students.write().map_err(|_| Self::poisoned())?;
        if students.contains_key(&profile.id) {
            return Ok(false);
        }
        students.insert(profile.id.clone(), profile.clone());
        Ok(true)
    }

    fn update(&self, profile: &StudentProfile) -> Result<bool> {
        let mut students = self.students.write().map_err(|_| Self::poisoned())?;
        match students.get_mut(&profile.id) {
            Some(existing) => {
                *existing = profile.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
