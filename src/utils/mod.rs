pub mod prompt;

use anyhow::Result;
use std::path::PathBuf;
use which::which;

use crate::errors::AppError;

/// Finds an executable in the system PATH.
pub fn find_executable(name: &str) -> Result<PathBuf> {
    which(name).map_err(|_| AppError::ExecutableNotFound(name.to_string()).into())
}

/// Quotes `value` for a POSIX shell; plain paths are left as they are.
pub fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:@%+=,".contains(c));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_executable() {
        assert!(find_executable("sh").is_ok());
        let err = find_executable("definitely-not-a-real-binary-42").unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::ExecutableNotFound(_))));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/srv/app/current"), "/srv/app/current");
        assert_eq!(shell_quote("/home/me/My Projects/app"), "'/home/me/My Projects/app'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }
}
