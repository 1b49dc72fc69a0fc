use std::path::PathBuf;
use std::time::SystemTime;

/// Кандидат на доставку, полученный при сканировании директории.
/// Живёт только внутри одного скана, никуда не сохраняется.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub is_regular: bool,
    pub created: SystemTime,
}

impl CandidateFile {
    pub fn new(path: PathBuf, is_regular: bool, created: SystemTime) -> Self {
        Self {
            path,
            is_regular,
            created,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_candidate_file_name() {
        let candidate = CandidateFile::new(
            PathBuf::from("/tmp/shots/Screenshot 1.png"),
            true,
            SystemTime::UNIX_EPOCH,
        );
        assert_eq!(candidate.file_name(), "Screenshot 1.png");
    }

    #[test]
    fn test_candidates_sort_by_creation_time() {
        let older = CandidateFile::new(
            PathBuf::from("/tmp/b.png"),
            true,
            SystemTime::UNIX_EPOCH,
        );
        let newer = CandidateFile::new(
            PathBuf::from("/tmp/a.png"),
            true,
            SystemTime::UNIX_EPOCH + Duration::from_secs(5),
        );

        let mut candidates = vec![newer.clone(), older.clone()];
        candidates.sort_by_key(|c| c.created);

        assert_eq!(candidates[0], older);
        assert_eq!(candidates[1], newer);
    }
}
