/// Turn a task label into something safe to embed in a file name.
///
/// Keeps ASCII letters, digits, `.` and `_`; every other run of characters
/// collapses to a single `-`. Leading and trailing dots are dropped, so the
/// result never names a parent directory. Labels with nothing usable become
/// `host`.
pub(crate) fn file_stem(value: &str) -> String {
    let mut out = String::new();
    let mut prev_was_dash = false;

    for ch in value.trim().chars() {
        let normalized = match ch {
            'a'..='z' | '0'..='9' | '.' | '_' => Some(ch),
            'A'..='Z' => Some(ch.to_ascii_lowercase()),
            _ => None,
        };

        match normalized {
            Some(c) => {
                out.push(c);
                prev_was_dash = false;
            }
            None => {
                if out.is_empty() || prev_was_dash {
                    continue;
                }
                out.push('-');
                prev_was_dash = true;
            }
        }
    }

    let trimmed = out.trim_matches(['.', '-']);
    if trimmed.is_empty() {
        return "host".to_string();
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_keeps_hostname_characters() {
        assert_eq!(file_stem("web-01.example.com"), "web-01.example.com");
    }

    #[test]
    fn file_stem_lowercases() {
        assert_eq!(file_stem("DB-Primary"), "db-primary");
    }

    #[test]
    fn file_stem_replaces_user_at_host() {
        assert_eq!(file_stem("user@db-server"), "user-db-server");
    }

    #[test]
    fn file_stem_collapses_separators() {
        assert_eq!(file_stem("a / b :: c"), "a-b-c");
    }

    #[test]
    fn file_stem_strips_path_traversal() {
        assert_eq!(file_stem("../../etc/passwd"), "etc-passwd");
    }

    #[test]
    fn file_stem_falls_back_for_unusable_label() {
        assert_eq!(file_stem("@@@"), "host");
        assert_eq!(file_stem("   "), "host");
    }
}
