//! Mainframe dataset name handling.
//!
//! Remote file arguments are either POSIX paths or dataset names. A dataset
//! name starts with `//` and may be enclosed in double quotes and/or carry
//! inner single quotes: `//dsn.name`, `"//dsn.name"`, `//'dsn.name'`. When
//! sending remote-file commands the normalised form `"//'NAME'"` is used.

use std::path::Path;

/// Check whether a string names a dataset rather than a POSIX path.
pub fn is_dsn(s: &str) -> bool {
    s.trim_matches('"').starts_with("//")
}

/// Normalise a dataset name to the quoted form used on the remote side,
/// `"//'dsn.name'"`.
pub fn normalize(dsn: &str) -> String {
    let dsn = dsn.trim_matches('"');
    if dsn.starts_with("//") {
        format!("\"{dsn}\"")
    } else {
        format!("\"//'{dsn}'\"")
    }
}

/// Base name of a dataset or path, used to derive local temp file names.
///
/// For datasets the last qualifier is used, or the member name inside
/// parentheses when present. For anything else the path base name is
/// returned.
pub fn path_base(s: &str) -> String {
    if !is_dsn(s) {
        return Path::new(s)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| s.to_string());
    }

    let name = s
        .trim_matches('"')
        .trim_start_matches('/')
        .trim_matches('\'');
    let last = name.rsplit('.').next().unwrap_or(name);
    match last.split_once('(') {
        Some((_, member)) => member.trim_end_matches(')').to_string(),
        None => last.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_dsn() {
        assert!(is_dsn("//SYS1.PARMLIB"));
        assert!(is_dsn("\"//SYS1.PARMLIB\""));
        assert!(is_dsn("//'SYS1.PARMLIB'"));
        assert!(!is_dsn("/etc/profile"));
        assert!(!is_dsn("relative/path.txt"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("//SYS1.PARMLIB"), "\"//SYS1.PARMLIB\"");
        assert_eq!(normalize("\"//'SYS1.PARMLIB'\""), "\"//'SYS1.PARMLIB'\"");
        assert_eq!(normalize("SYS1.PARMLIB"), "\"//'SYS1.PARMLIB'\"");
    }

    #[test]
    fn test_path_base_dataset() {
        assert_eq!(path_base("//'SYS1.PARMLIB'"), "PARMLIB");
        assert_eq!(path_base("//USER.JCL.CNTL"), "CNTL");
    }

    #[test]
    fn test_path_base_member() {
        assert_eq!(path_base("//'USER.JCL.CNTL(BUILD)'"), "BUILD");
        assert_eq!(path_base("\"//USER.PDS(MEMBER)\""), "MEMBER");
    }

    #[test]
    fn test_path_base_posix() {
        assert_eq!(path_base("/tmp/notes.txt"), "notes.txt");
        assert_eq!(path_base("plain"), "plain");
    }
}
