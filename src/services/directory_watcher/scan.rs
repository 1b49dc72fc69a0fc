use crate::config::Config;
use crate::events::CandidateFile;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use tokio::time::Duration;
use tracing::debug;

/// Снять снимок подходящих имён файлов. Используется при старте сессии,
/// чтобы уже существующие файлы никогда не доставлялись. Имя занимает
/// только обычный файл: каталог его не резервирует.
pub fn snapshot_seen(config: &Config, dir: &Path) -> std::io::Result<HashSet<String>> {
    let mut seen = HashSet::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        let name = entry.file_name().to_string_lossy().to_string();
        if is_file && config.is_screenshot_name(&name) {
            seen.insert(name);
        }
    }

    Ok(seen)
}

/// Просканировать директорию и вернуть подходящие по имени записи,
/// отсортированные по времени создания (одинаковое время - порядок
/// перечисления). Необычные записи помечаются is_regular = false.
pub fn scan_candidates(config: &Config, dir: &Path) -> std::io::Result<Vec<CandidateFile>> {
    let mut candidates = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !config.is_screenshot_name(&name) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("Не удалось прочитать метаданные {:?}: {}", entry.path(), e);
                continue;
            }
        };
        // btime не везде поддерживается - mtime как запасной вариант
        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        candidates.push(CandidateFile::new(entry.path(), metadata.is_file(), created));
    }

    // Стабильная сортировка сохраняет порядок перечисления при равном времени
    candidates.sort_by_key(|c| c.created);
    Ok(candidates)
}

/// Файл открывается и имеет ненулевой размер
pub fn is_readable_nonempty(path: &Path) -> bool {
    if fs::File::open(path).is_err() {
        return false;
    }
    fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// Дождаться готовности файла: скриншоты пишутся инкрементально, и сразу
/// после события файл может быть пустым или недописанным
pub async fn wait_until_readable(path: &Path, attempts: u32, interval_ms: u64) -> bool {
    for attempt in 0..attempts {
        if is_readable_nonempty(path) {
            return true;
        }
        debug!(
            "Файл {:?} ещё не готов (попытка {}/{})",
            path,
            attempt + 1,
            attempts
        );
        tokio::time::sleep(Duration::from_millis(interval_ms)).await;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "shotbridge-scan-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_snapshot_only_qualifying_names() {
        let dir = scratch_dir("snapshot");
        fs::write(dir.join("IMG_1.png"), b"x").unwrap();
        fs::write(dir.join("Screenshot 1.png"), b"x").unwrap();
        fs::write(dir.join("notes.txt"), b"x").unwrap();

        let config = Config::default();
        let seen = snapshot_seen(&config, &dir).unwrap();

        assert_eq!(seen.len(), 1);
        assert!(seen.contains("Screenshot 1.png"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_scan_orders_by_creation_time() {
        let dir = scratch_dir("order");
        let config = Config::default();

        fs::write(dir.join("Screenshot older.png"), b"x").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        fs::write(dir.join("Screenshot newer.png"), b"x").unwrap();

        let candidates = scan_candidates(&config, &dir).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].file_name(), "Screenshot older.png");
        assert_eq!(candidates[1].file_name(), "Screenshot newer.png");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_scan_marks_directories_as_irregular() {
        let dir = scratch_dir("dirs");
        let config = Config::default();

        fs::create_dir_all(dir.join("Screenshot folder.png")).unwrap();
        fs::write(dir.join("Screenshot real.png"), b"x").unwrap();

        let candidates = scan_candidates(&config, &dir).unwrap();
        assert_eq!(candidates.len(), 2);

        let folder = candidates
            .iter()
            .find(|c| c.file_name() == "Screenshot folder.png")
            .unwrap();
        assert!(!folder.is_regular);

        let real = candidates
            .iter()
            .find(|c| c.file_name() == "Screenshot real.png")
            .unwrap();
        assert!(real.is_regular);

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_readability_gate_rejects_empty_file() {
        let dir = scratch_dir("empty");
        let path = dir.join("Screenshot empty.png");
        fs::write(&path, b"").unwrap();

        assert!(!is_readable_nonempty(&path));
        assert!(!wait_until_readable(&path, 2, 10).await);

        fs::write(&path, b"bytes").unwrap();
        assert!(is_readable_nonempty(&path));
        assert!(wait_until_readable(&path, 2, 10).await);

        let _ = fs::remove_dir_all(&dir);
    }
}
