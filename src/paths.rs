//! Path arguments as typed under Git Bash on Windows.

use std::path::PathBuf;

/// Turn a Git Bash drive path (`/c/Users/me`) into `C:/Users/me`.
/// Anything else is returned unchanged.
pub fn normalize_path(path: &str) -> String {
    let bytes = path.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b'/' {
        return format!("{}:{}", bytes[1].to_ascii_uppercase() as char, &path[2..]);
    }
    path.to_string()
}

pub fn normalize_dir(path: &str) -> PathBuf {
    PathBuf::from(normalize_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_bash_drive_paths() {
        assert_eq!(normalize_path("/c/Users/me/comp"), "C:/Users/me/comp");
        assert_eq!(normalize_path("/d/"), "D:/");
    }

    #[test]
    fn test_other_paths_untouched() {
        assert_eq!(normalize_path("."), ".");
        assert_eq!(normalize_path("/home/me"), "/home/me");
        assert_eq!(normalize_path("/c"), "/c");
        assert_eq!(normalize_path("/1/x"), "/1/x");
        assert_eq!(normalize_path("titanic"), "titanic");
    }
}
